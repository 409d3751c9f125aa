use super::*;

fn sid(s: &str) -> StyleId {
    StyleId::new(s).unwrap()
}

#[test]
fn normalize_path_slash_normalization() {
    assert_eq!(normalize_rel_path("a/b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("a\\b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("./a//b.png").unwrap(), "a/b.png");
    assert!(normalize_rel_path("../x.png").is_err());
    assert!(normalize_rel_path("/abs.png").is_err());
    assert!(normalize_rel_path("a/.stylecache-123").is_err());
}

#[test]
fn cache_path_mirrors_nested_and_flat_sources() {
    let r = CachePathResolver::new("/srv/img", "/srv/cache");
    assert_eq!(
        r.cache_path(&sid("5"), "a/b/c.png"),
        PathBuf::from("/srv/cache/5/a/b/c.png")
    );
    assert_eq!(
        r.cache_path(&sid("5"), "c.png"),
        PathBuf::from("/srv/cache/5/c.png")
    );
    assert_eq!(r.source_path("a/b/c.png"), PathBuf::from("/srv/img/a/b/c.png"));
}

#[test]
fn split_strips_prefix_image_segment_and_query() {
    let r = CachePathResolver::new("/i", "/c");
    let (style, rel) = r
        .split("/files/image/cache/5/image/a/b/c.png?itok=xyz")
        .unwrap();
    assert_eq!(style, sid("5"));
    assert_eq!(rel, "a/b/c.png");

    let (style, rel) = r.split("thumb/cat.jpg").unwrap();
    assert_eq!(style, sid("thumb"));
    assert_eq!(rel, "cat.jpg");
}

#[test]
fn split_only_collapses_image_right_after_style() {
    let r = CachePathResolver::new("/i", "/c");
    let (_, rel) = r.split("files/image/cache/5/a/image/c.png").unwrap();
    assert_eq!(rel, "a/image/c.png");
}

#[test]
fn split_honours_custom_prefix_on_segment_boundaries() {
    let r = CachePathResolver::new("/i", "/c").with_url_prefix("/cache/");
    let (style, rel) = r.split("/cache/thumb/cat.jpg").unwrap();
    assert_eq!((style.as_str(), rel.as_str()), ("thumb", "cat.jpg"));

    // "mycache/" is not the "cache/" segment.
    let (style, _) = r.split("/mycache/thumb/cat.jpg").unwrap();
    assert_eq!(style.as_str(), "mycache");
}

#[test]
fn split_decodes_percent_escapes() {
    let r = CachePathResolver::new("/i", "/c");
    let (_, rel) = r.split("files/image/cache/5/my%20photo.png").unwrap();
    assert_eq!(rel, "my photo.png");
}

#[test]
fn split_rejects_short_or_escaping_paths() {
    let r = CachePathResolver::new("/i", "/c");
    for bad in [
        "",
        "files/image/cache/",
        "files/image/cache/5",
        "files/image/cache/5/",
        "files/image/cache/5/image",
        "files/image/cache/5/../secret.png",
        "files/image/cache/../x/y.png",
    ] {
        let err = r.split(bad).unwrap_err();
        assert!(matches!(err, StyleCacheError::NotFound(_)), "{bad}");
    }
}

#[test]
fn resolve_requires_existing_source_file() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    std::fs::create_dir_all(images.join("a")).unwrap();
    std::fs::write(images.join("a/c.png"), b"png").unwrap();

    let r = CachePathResolver::new(&images, dir.path().join("cache"));
    let resolved = r.resolve("files/image/cache/5/a/c.png").unwrap();
    assert_eq!(resolved.source_abs, images.join("a/c.png"));
    assert_eq!(resolved.cache_abs, dir.path().join("cache/5/a/c.png"));

    assert!(r.resolve("files/image/cache/5/a/missing.png").is_err());
    // Directories are not sources.
    assert!(r.resolve("files/image/cache/5/a").is_err());
}

#[test]
fn url_for_round_trips_through_split() {
    let r = CachePathResolver::new("/i", "/c");
    let url = r.url_for(&sid("7"), "a\\b.png").unwrap();
    assert_eq!(url, "files/image/cache/7/image/a/b.png");
    let (style, rel) = r.split(&url).unwrap();
    assert_eq!((style, rel.as_str()), (sid("7"), "a/b.png"));

    // Sources that themselves live under an `image/` directory.
    for rel in ["image/a.png", "image/image/b.png"] {
        let url = r.url_for(&sid("7"), rel).unwrap();
        let (_, back) = r.split(&url).unwrap();
        assert_eq!(back, rel);
    }
}

#[test]
fn split_rejects_non_utf8_escapes() {
    let r = CachePathResolver::new("/i", "/c");
    let err = r.split("files/image/cache/5/%ff%fe.png").unwrap_err();
    assert!(matches!(err, StyleCacheError::NotFound(_)));
}
