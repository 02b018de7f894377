mod decode;
mod flush;
mod lifecycle;
mod registration;
