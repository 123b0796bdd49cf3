pub mod feed;
pub mod routes;
pub mod state;
