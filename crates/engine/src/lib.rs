pub mod connection;
pub mod profile;
pub mod reducer;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
