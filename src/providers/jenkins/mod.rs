mod client;
mod types;

pub use client::{Credentials, JenkinsClient};
