//! Cache file location and configuration tests

use std::path::PathBuf;

use render_state_cache::cache::{CACHE_FILE_EXTENSION, CacheLocation, CacheLogLevel, RenderStateCacheConfig};
use render_state_cache::graphics::RenderDeviceType;
use render_state_cache::render_state_cache_file_path;

fn build_suffix() -> char {
    if cfg!(debug_assertions) { 'd' } else { 'r' }
}

#[test]
fn file_name_encodes_app_device_and_build() {
    let dir = tempfile::tempdir().unwrap();
    let location = CacheLocation::Directory(dir.path().to_path_buf());

    let path = render_state_cache_file_path(&location, Some("Viewer"), RenderDeviceType::Vulkan).unwrap();
    assert_eq!(
        path,
        dir.path().join(format!("Viewer_VK_{}.{CACHE_FILE_EXTENSION}", build_suffix()))
    );

    let path = render_state_cache_file_path(&location, None, RenderDeviceType::D3D12).unwrap();
    assert_eq!(path, dir.path().join(format!("D3D12_{}.{CACHE_FILE_EXTENSION}", build_suffix())));

    let path = render_state_cache_file_path(&location, Some(""), RenderDeviceType::Gl).unwrap();
    assert_eq!(path.file_name().unwrap(), PathBuf::from(format!("GL_{}.diligentcache", build_suffix())).as_os_str());
}

#[test]
fn missing_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("caches").join("shaders");
    let location = CacheLocation::Directory(nested.clone());

    let path = render_state_cache_file_path(&location, None, RenderDeviceType::Metal).unwrap();
    assert!(nested.is_dir());
    assert_eq!(path.parent().unwrap(), nested);
}

#[test]
fn config_loads_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, r#"{ "log_level": "verbose", "optimize_gl_shaders": false }"#).unwrap();

    let config = RenderStateCacheConfig::from_json_file(&path).unwrap();
    assert_eq!(config.log_level, CacheLogLevel::Verbose);
    assert!(!config.optimize_gl_shaders);
    assert!(!config.enable_hot_reload);

    std::fs::write(&path, r#"{ "log_level": "loud" }"#).unwrap();
    assert!(RenderStateCacheConfig::from_json_file(&path).is_err());
}
