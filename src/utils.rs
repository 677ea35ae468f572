pub(crate) mod errors;

#[cfg(test)]
pub(crate) mod tempdir;
