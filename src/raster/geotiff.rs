//! GeoTIFF reading and writing on top of the `tiff` codec.
//!
//! Only the parts of GeoTIFF the portal's maps use are handled: a tie point with a pixel
//! scale (or a full transformation matrix), the EPSG code from the geokey directory and
//! GDAL's nodata tag.

use crate::raster::dataset::{Crs, GeoTransform, RasterDataset};
use crate::raster::error::RasterError;
use log::debug;
use std::io::{Cursor, Read, Seek};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;
const USER_DEFINED: u16 = 32767;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Decodes the first band of a GeoTIFF held in memory.
pub fn decode(bytes: &[u8]) -> Result<RasterDataset, RasterError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let transform = read_transform(&mut decoder)?;
    let crs = read_crs(&mut decoder)?;
    let nodata = read_nodata(&mut decoder)?;
    let pixels = first_band(decoder.read_image()?, width, height)?;

    debug!(
        "Decoded {}x{} GeoTIFF ({}), nodata {:?}",
        width, height, crs, nodata
    );
    Ok(RasterDataset::new(width, height, pixels, transform, crs)?.with_nodata(nodata))
}

/// Encodes a raster as a single-band Float32 GeoTIFF.
pub fn encode(raster: &RasterDataset) -> Result<Vec<u8>, RasterError> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buffer)?;
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(raster.width() as u32, raster.height() as u32)?;

        let t = raster.transform();
        let directory = image.encoder();
        if t.is_north_up() {
            directory.write_tag(
                Tag::ModelPixelScaleTag,
                &[t.pixel_width, -t.pixel_height, 0.0][..],
            )?;
            directory.write_tag(
                Tag::ModelTiepointTag,
                &[0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0][..],
            )?;
        } else {
            #[rustfmt::skip]
            let matrix = [
                t.pixel_width, t.row_rotation, 0.0, t.origin_x,
                t.column_rotation, t.pixel_height, 0.0, t.origin_y,
                0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ];
            directory.write_tag(Tag::ModelTransformationTag, &matrix[..])?;
        }
        directory.write_tag(Tag::GeoKeyDirectoryTag, &geokey_directory(raster.crs())[..])?;
        if let Some(nodata) = raster.nodata() {
            directory.write_tag(Tag::GdalNodata, format!("{nodata:e}").as_str())?;
        }

        image.write_data(raster.data())?;
    }
    Ok(buffer.into_inner())
}

fn find_f64s<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
) -> Result<Option<Vec<f64>>, RasterError> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform, RasterError> {
    if let Some(m) = find_f64s(decoder, Tag::ModelTransformationTag)? {
        if m.len() < 8 {
            return Err(RasterError::MalformedTag {
                tag: "ModelTransformation",
                message: format!("expected 16 values, found {}", m.len()),
            });
        }
        return Ok(GeoTransform {
            origin_x: m[3],
            pixel_width: m[0],
            row_rotation: m[1],
            origin_y: m[7],
            column_rotation: m[4],
            pixel_height: m[5],
        });
    }

    let scale = find_f64s(decoder, Tag::ModelPixelScaleTag)?;
    let tiepoint = find_f64s(decoder, Tag::ModelTiepointTag)?;
    match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) => {
            if scale.len() < 2 {
                return Err(RasterError::MalformedTag {
                    tag: "ModelPixelScale",
                    message: format!("expected 3 values, found {}", scale.len()),
                });
            }
            if tiepoint.len() < 6 {
                return Err(RasterError::MalformedTag {
                    tag: "ModelTiepoint",
                    message: format!("expected 6 values, found {}", tiepoint.len()),
                });
            }
            // Tie point maps raster (i, j) to model (x, y); shift it back to pixel (0, 0).
            let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
            Ok(GeoTransform::north_up(
                x - i * scale[0],
                y + j * scale[1],
                scale[0],
                scale[1],
            ))
        }
        _ => Err(RasterError::MissingGeoreference),
    }
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Crs, RasterError> {
    let Some(directory) = decoder.find_tag(Tag::GeoKeyDirectoryTag)? else {
        return Ok(Crs::Unknown);
    };
    let directory = directory.into_u16_vec()?;
    if directory.len() < 4 {
        return Err(RasterError::MalformedTag {
            tag: "GeoKeyDirectory",
            message: format!("header needs 4 values, found {}", directory.len()),
        });
    }

    let mut geographic = None;
    let mut projected = None;
    for entry in directory[4..].chunks_exact(4).take(directory[3] as usize) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        // Location 0 means the value is stored inline.
        if location != 0 || value == USER_DEFINED || value == 0 {
            continue;
        }
        match key {
            KEY_GEOGRAPHIC_TYPE => geographic = Some(value),
            KEY_PROJECTED_CS_TYPE => projected = Some(value),
            _ => {}
        }
    }
    Ok(projected.or(geographic).map_or(Crs::Unknown, Crs::Epsg))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>, RasterError> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    text.parse::<f64>()
        .map(Some)
        .map_err(|e| RasterError::MalformedTag {
            tag: "GDAL_NODATA",
            message: format!("'{text}' is not a number: {e}"),
        })
}

fn first_band(
    result: DecodingResult,
    width: usize,
    height: usize,
) -> Result<Vec<f32>, RasterError> {
    let values: Vec<f32> = match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
    };

    let expected = width * height;
    if expected == 0 {
        return Err(RasterError::Empty { width, height });
    }
    if values.len() == expected {
        return Ok(values);
    }
    // Interleaved samples: keep the first one of every pixel.
    if values.len() % expected == 0 {
        let samples = values.len() / expected;
        return Ok(values.into_iter().step_by(samples).collect());
    }
    Err(RasterError::BufferSize {
        width,
        height,
        expected,
        found: values.len(),
    })
}

fn geokey_directory(crs: Crs) -> Vec<u16> {
    let mut keys: Vec<[u16; 4]> = Vec::new();
    match crs {
        Crs::Epsg(code) if (4000..5000).contains(&code) => {
            keys.push([KEY_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
            keys.push([KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.push([KEY_GEOGRAPHIC_TYPE, 0, 1, code]);
        }
        Crs::Epsg(code) => {
            keys.push([KEY_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED]);
            keys.push([KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.push([KEY_PROJECTED_CS_TYPE, 0, 1, code]);
        }
        Crs::Unknown => keys.push([KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]),
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    directory
}

#[cfg(test)]
mod tests {
    use super::*;

    const HCDP_NODATA: f64 = -3.4028234663852886e38;

    fn hawaii_grid() -> RasterDataset {
        let (width, height) = (6, 4);
        let data = (0..width * height)
            .map(|i| if i % 5 == 0 { HCDP_NODATA as f32 } else { i as f32 * 1.5 })
            .collect();
        RasterDataset::new(
            width,
            height,
            data,
            GeoTransform::north_up(-159.816, 22.2955, 0.0025, 0.0025),
            Crs::WGS84,
        )
        .unwrap()
        .with_nodata(Some(HCDP_NODATA))
    }

    #[test]
    fn test_written_geotiff_reads_back_with_georeference() -> Result<(), RasterError> {
        let grid = hawaii_grid();
        let bytes = encode(&grid)?;
        let decoded = decode(&bytes)?;

        assert_eq!(decoded.shape(), (4, 6));
        assert_eq!(decoded.data(), grid.data());
        assert_eq!(decoded.crs(), Crs::WGS84);
        assert_eq!(decoded.nodata(), Some(HCDP_NODATA));
        assert!(decoded.transform().is_north_up());
        assert!((decoded.transform().origin_x - -159.816).abs() < 1e-12);
        assert!((decoded.transform().pixel_height - -0.0025).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_rotated_transform_uses_matrix_tag() -> Result<(), RasterError> {
        let transform = GeoTransform {
            origin_x: 500_000.0,
            pixel_width: 250.0,
            row_rotation: 10.0,
            origin_y: 2_500_000.0,
            column_rotation: 5.0,
            pixel_height: -250.0,
        };
        let raster = RasterDataset::new(2, 2, vec![1.0, 2.0, 3.0, 4.0], transform, Crs::Epsg(32604))?;
        let decoded = decode(&encode(&raster)?)?;
        assert_eq!(*decoded.transform(), transform);
        assert_eq!(decoded.crs(), Crs::Epsg(32604));
        assert_eq!(decoded.nodata(), None);
        Ok(())
    }

    #[test]
    fn test_non_tiff_bytes_are_rejected() {
        let result = decode(b"<html><body>File not found</body></html>");
        assert!(matches!(result, Err(RasterError::Tiff(_))));
    }

    #[test]
    fn test_first_band_of_interleaved_samples() -> Result<(), RasterError> {
        let rgb = DecodingResult::U8(vec![1, 100, 200, 2, 100, 200]);
        assert_eq!(first_band(rgb, 2, 1)?, vec![1.0, 2.0]);
        let short = DecodingResult::F32(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            first_band(short, 2, 1),
            Err(RasterError::BufferSize { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_geokey_directory_layout() {
        assert_eq!(
            geokey_directory(Crs::WGS84),
            vec![1, 1, 0, 3, 1024, 0, 1, 2, 1025, 0, 1, 1, 2048, 0, 1, 4326]
        );
        assert_eq!(geokey_directory(Crs::Unknown), vec![1, 1, 0, 1, 1025, 0, 1, 1]);
    }
}
