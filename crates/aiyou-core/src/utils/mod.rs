pub mod debug;
pub mod sse;

#[cfg(test)]
pub mod test_helpers;
