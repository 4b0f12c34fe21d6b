use crate::error::ImageInputError;
use image::{DynamicImage, GenericImageView, RgbImage};

/// An image handed to the classifier, either still encoded or already decoded.
#[derive(Debug, Clone)]
pub enum ImageInput {
    Encoded(Vec<u8>),
    Decoded(DynamicImage),
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Encoded(bytes)
    }
}

impl From<&[u8]> for ImageInput {
    fn from(bytes: &[u8]) -> Self {
        ImageInput::Encoded(bytes.to_vec())
    }
}

impl From<DynamicImage> for ImageInput {
    fn from(image: DynamicImage) -> Self {
        ImageInput::Decoded(image)
    }
}

impl From<RgbImage> for ImageInput {
    fn from(image: RgbImage) -> Self {
        ImageInput::Decoded(DynamicImage::ImageRgb8(image))
    }
}

impl ImageInput {
    /// Converts to the 8-bit RGB layout the engines consume.
    pub fn into_rgb(self) -> Result<RgbImage, ImageInputError> {
        let image = match self {
            ImageInput::Encoded(bytes) => decode(&bytes)?,
            ImageInput::Decoded(image) => image,
        };

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageInputError::Empty { width, height });
        }

        Ok(image.into_rgb8())
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageInputError> {
    let image_reader =
        image::ImageReader::new(std::io::Cursor::new(bytes)).with_guessed_format()?;
    Ok(image_reader.decode()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};
    use std::io::Cursor;

    #[test]
    fn test_decode_png_bytes() {
        let img = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_pixel(40, 30, Rgba([0, 255, 0, 255]));
        let mut image_data: Vec<u8> = Vec::new();
        img.write_to(&mut Cursor::new(&mut image_data), image::ImageFormat::Png)
            .unwrap();

        let rgb = ImageInput::from(image_data).into_rgb().unwrap();

        assert_eq!(rgb.dimensions(), (40, 30));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([0, 255, 0]));
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let result = ImageInput::from(vec![0u8; 100]).into_rgb();
        assert!(matches!(result, Err(ImageInputError::Decode(_))));
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let result = ImageInput::from(RgbImage::new(0, 10)).into_rgb();
        assert!(matches!(
            result,
            Err(ImageInputError::Empty {
                width: 0,
                height: 10
            })
        ));
    }
}
