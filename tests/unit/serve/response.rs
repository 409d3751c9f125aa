use std::time::{Duration, UNIX_EPOCH};

use super::*;

#[test]
fn http_date_uses_imf_fixdate() {
    let t = UNIX_EPOCH + Duration::from_secs(784_111_777);
    assert_eq!(http_date(t), "Sun, 06 Nov 1994 08:49:37 GMT");
}

#[test]
fn content_type_follows_extension() {
    assert_eq!(content_type(Path::new("a/cat.jpg")), "image/jpeg");
    assert_eq!(content_type(Path::new("cat.PNG")), "image/png");
    assert_eq!(content_type(Path::new("notes.xyz")), "application/octet-stream");
}

#[test]
fn headers_describe_the_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x.png");
    std::fs::write(&path, b"12345").unwrap();

    let headers = CacheHeaders::for_file(&path, 600).unwrap();
    assert_eq!(headers.cache_control, "public, max-age=600");
    assert_eq!(headers.content_length, 5);
    assert_eq!(headers.content_type, "image/png");
    assert!(headers.last_modified.ends_with(" GMT"));
    assert_eq!(headers.pairs()[0].0, "Cache-Control");
}

#[test]
fn not_found_has_no_body() {
    assert_eq!(Response::NotFound.status(), 404);
    assert!(Response::NotFound.served().is_none());
    assert!(Response::NotFound.into_served().is_err());
}
