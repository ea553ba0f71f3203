pub mod core {
    pub mod data_type;
    pub mod value;
}

pub mod execution {
    pub mod properties;
}

pub mod pagination {
    pub mod cursor;
}

pub mod records {
    pub mod chunk;
    pub mod row;
}
