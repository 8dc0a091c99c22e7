pub mod analyser;
pub mod delegate;
pub mod encoder;
pub mod input_device;
pub mod surface;
pub mod uploader;
