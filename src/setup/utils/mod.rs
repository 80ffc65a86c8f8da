pub mod cmd;
pub mod fingerprint;
pub mod hostsfile;
pub mod kubectl;
pub mod pkg;
