mod sled_data_store;


pub use sled_data_store::*;
