pub mod acquire;
pub mod analyzers;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod parser;
pub mod services;
pub mod snapshot;
pub mod stats;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
