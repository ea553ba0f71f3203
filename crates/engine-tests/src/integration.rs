//! Round trips against live databases. Run with `cargo test -- --ignored`
//! once the Postgres and MySQL test instances are up.
