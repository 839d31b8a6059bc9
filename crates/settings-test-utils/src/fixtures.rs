//! Sample settings files shipped in `test-fixtures/settings`.

/// Content of `remote.xml`, the file every populated upstream starts with.
pub const REMOTE_XML: &[u8] = include_bytes!("../../../test-fixtures/settings/remote.xml");

/// Content of `local.xml`, the file tests add on the local side.
pub const LOCAL_XML: &[u8] = include_bytes!("../../../test-fixtures/settings/local.xml");

/// Fixture content for a settings path, chosen by its file name.
///
/// `_mac/local2.xml` and `local.xml` both map to [`LOCAL_XML`].
///
/// # Panics
/// Panics for file names without a fixture.
pub fn data_for(path: &str) -> &'static [u8] {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name {
        "remote.xml" => REMOTE_XML,
        name if name.starts_with("local") => LOCAL_XML,
        other => panic!("data_for: no fixture for {other}"),
    }
}
