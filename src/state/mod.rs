pub mod observed_store;

pub use observed_store::ObservedStore;
