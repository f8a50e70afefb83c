pub mod aggregate;
pub mod rates;
pub mod spikes;
