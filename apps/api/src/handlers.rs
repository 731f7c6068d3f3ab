pub mod approval;
pub mod dashboard;
pub mod health;
pub mod requests;
pub mod webhook;

#[cfg(test)]
mod test_support;
