pub mod principal_reader;
pub mod transfer_writer;
