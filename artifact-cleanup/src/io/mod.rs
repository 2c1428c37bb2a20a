//! Side-effecting collaborators: config file, token input, GitLab API.

pub mod config;
pub mod gitlab;
pub mod source;
pub mod token;
