//! Request fixtures

use axum_test::multipart::{MultipartForm, Part};

/// Smallest byte sequence that still starts like a JPEG.
pub fn jpeg_bytes() -> Vec<u8> {
    vec![
        0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0xff,
        0xd9,
    ]
}

pub fn photo_part() -> Part {
    Part::bytes(jpeg_bytes())
        .file_name("photo.jpg")
        .mime_type("image/jpeg")
}

/// Upload form with the photo and optional user fields.
pub fn photo_form(user_name: Option<&str>, user_email: Option<&str>) -> MultipartForm {
    let mut form = MultipartForm::new().add_part("file", photo_part());
    if let Some(name) = user_name {
        form = form.add_text("userName", name.to_string());
    }
    if let Some(email) = user_email {
        form = form.add_text("userEmail", email.to_string());
    }
    form
}
