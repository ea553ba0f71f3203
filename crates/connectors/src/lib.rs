pub mod adapter;
pub mod connector;
pub mod error;
pub mod memory;

pub mod sql {
    pub mod base {
        pub mod dialect;
        pub mod error;
        pub mod requests;
        pub mod utils;

        pub mod query {
            pub mod generator;
        }
    }

    pub mod mysql {
        pub mod adapter;
        pub mod params;
        pub mod row;
    }

    pub mod postgres {
        pub mod adapter;
        pub mod params;
        pub mod row;
        pub mod utils;
    }
}
