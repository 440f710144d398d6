pub mod context;
pub mod dispatcher;
pub mod receive_path;
pub mod registry;
pub mod send_path;
pub mod track;

#[cfg(test)]
pub(crate) mod test_support;
