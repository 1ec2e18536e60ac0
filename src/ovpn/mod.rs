pub mod ccd;
pub mod conf;
