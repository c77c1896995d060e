use std::fs;
use survey::{DirListing, FileListing, SurveyError, index_directories};

#[test]
fn indexes_two_directories() {
    let root = tempfile::tempdir().unwrap();
    let real = root.path().join("real");
    let synth = root.path().join("synth");
    fs::create_dir_all(&real).unwrap();
    fs::create_dir_all(synth.join("nested")).unwrap();

    for name in ["20241114_0250.jpg", "20241114_0300.jpg", "notes.txt"] {
        fs::write(real.join(name), b"x").unwrap();
    }
    for name in [
        "20241114_0250_r14_FLDK_synthesized_image.jpg",
        "20241115_0300_r14_FLDK_synthesized_image.jpg",
    ] {
        fs::write(synth.join(name), b"x").unwrap();
    }
    fs::write(synth.join("nested").join("20241114_0300_x.jpg"), b"x").unwrap();

    let mut names = DirListing::images(&real).list().unwrap();
    names.sort();
    assert_eq!(names, vec!["20241114_0250.jpg", "20241114_0300.jpg"]);

    let universe =
        index_directories(&DirListing::images(&real), &DirListing::images(&synth), '_').unwrap();
    assert_eq!(universe.len(), 1);
    let pair = universe.get("20241114_0250").unwrap();
    assert_eq!(pair.synth_filename, "20241114_0250_r14_FLDK_synthesized_image.jpg");
}

#[test]
fn missing_directory_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let err = DirListing::all(root.path().join("absent")).list().unwrap_err();
    assert!(matches!(err, SurveyError::Listing { .. }));
}
