pub mod comparator;
pub mod replication;
