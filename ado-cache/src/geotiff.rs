use std::io::Cursor;
use tiff::decoder::Decoder;
use tiff::tags::Tag;

use crate::tile::{TileBounds, TileError};

/// Bounds of a north-up raster from its tiepoint and pixel scale.
///
/// `tiepoint` is `[i, j, k, x, y, z]` (raster point `(i, j)` sits at model
/// point `(x, y)`), `scale` is `[sx, sy, sz]`.
pub fn bounds_from_geotags(
    width: u32,
    height: u32,
    tiepoint: &[f64],
    scale: &[f64],
) -> Result<TileBounds, TileError> {
    let (&[i, j, _, x, y, ..], &[sx, sy, ..]) = (tiepoint, scale) else {
        return Err(TileError::Decode(format!(
            "expected 6 tiepoint and 2 scale values, got {} and {}",
            tiepoint.len(),
            scale.len()
        )));
    };
    if sx <= 0.0 || sy <= 0.0 {
        return Err(TileError::Decode(format!("non-positive pixel scale ({}, {})", sx, sy)));
    }
    let west = x - i * sx;
    let north = y + j * sy;
    Ok(TileBounds {
        west,
        south: north - height as f64 * sy,
        east: west + width as f64 * sx,
        north,
    })
}

/// Read the georeferenced bounds of a GeoTIFF. Pixel data is not decoded.
pub fn decode_bounds(bytes: &[u8]) -> Result<TileBounds, TileError> {
    let decode = |e: tiff::TiffError| TileError::Decode(e.to_string());
    let mut decoder = Decoder::new(Cursor::new(bytes)).map_err(decode)?;
    let (width, height) = decoder.dimensions().map_err(decode)?;
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(decode)?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(decode)?;
    bounds_from_geotags(width, height, &tiepoint, &scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::colortype::Gray8;
    use tiff::encoder::TiffEncoder;

    #[test]
    fn test_bounds_from_upper_left_tiepoint() {
        let tiepoint = [0.0, 0.0, 0.0, 5.0, 48.0, 0.0];
        let bounds = bounds_from_geotags(200, 100, &tiepoint, &[0.05, 0.05, 0.0]).unwrap();
        assert_eq!(
            bounds,
            TileBounds {
                west: 5.0,
                south: 43.0,
                east: 15.0,
                north: 48.0
            }
        );
    }

    #[test]
    fn test_bounds_from_offset_tiepoint() {
        let tiepoint = [2.0, 4.0, 0.0, 12.0, 46.0, 0.0];
        let bounds = bounds_from_geotags(10, 10, &tiepoint, &[1.0, 0.5, 0.0]).unwrap();
        assert_eq!(bounds.west, 10.0);
        assert_eq!(bounds.north, 48.0);
        assert_eq!(bounds.east, 20.0);
        assert_eq!(bounds.south, 43.0);
    }

    #[test]
    fn test_short_tags_rejected() {
        assert!(matches!(
            bounds_from_geotags(1, 1, &[0.0, 0.0], &[1.0, 1.0]),
            Err(TileError::Decode(_))
        ));
        assert!(bounds_from_geotags(1, 1, &[0.0; 6], &[0.0, 1.0]).is_err());
    }

    fn encode_gray(width: u32, height: u32, tiepoint: Option<&[f64]>, scale: &[f64]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut encoder = TiffEncoder::new(&mut buffer).unwrap();
        let mut image = encoder.new_image::<Gray8>(width, height).unwrap();
        image.encoder().write_tag(Tag::ModelPixelScaleTag, scale).unwrap();
        if let Some(tiepoint) = tiepoint {
            image.encoder().write_tag(Tag::ModelTiepointTag, tiepoint).unwrap();
        }
        image
            .write_data(&vec![0u8; (width * height) as usize])
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_decode_bounds_from_encoded_geotiff() {
        let tif = encode_gray(4, 2, Some(&[0.0, 0.0, 0.0, 5.0, 48.0, 0.0]), &[0.5, 0.5, 0.0]);
        assert_eq!(
            decode_bounds(&tif).unwrap(),
            TileBounds {
                west: 5.0,
                south: 47.0,
                east: 7.0,
                north: 48.0
            }
        );
    }

    #[test]
    fn test_missing_tiepoint_is_decode_error() {
        let tif = encode_gray(4, 2, None, &[0.5, 0.5, 0.0]);
        assert!(matches!(decode_bounds(&tif), Err(TileError::Decode(_))));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            decode_bounds(b"definitely not a tiff"),
            Err(TileError::Decode(_))
        ));
    }
}
