use crate::error::{Error, Result};
use crate::page::{Page, RasterRows};
use png::{BitDepth, ColorType, Unit};

const INCH_IN_METERS: f64 = 0.0254;

/// Decode a PNG into one page of packed raster rows.
///
/// Each image row becomes one raster line, packed MSB first. Pixels darker
/// than mid-grey print black. The vertical resolution comes from the pHYs
/// chunk when present, otherwise from `default_dpi`.
pub fn png_to_page(png_data: &[u8], default_dpi: u32) -> Result<Page<RasterRows>> {
    let mut decoder = png::Decoder::new(png_data);
    decoder.set_transformations(png::Transformations::EXPAND);
    let mut reader = decoder.read_info()?;

    let vertical_dpi = reader
        .info()
        .pixel_dims
        .filter(|dims| dims.unit == Unit::Meter)
        .map(|dims| (dims.yppu as f64 * INCH_IN_METERS).round() as u32)
        .unwrap_or(default_dpi);

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;

    if info.bit_depth != BitDepth::Eight {
        return Err(Error::Image(format!(
            "{:?} bit depth is not supported",
            info.bit_depth
        )));
    }

    let width = info.width as usize;
    let gray_buf = convert_to_grayscale(&buf[..info.buffer_size()], info.color_type)?;
    let rows = gray_buf
        .chunks(width.max(1))
        .take(info.height as usize)
        .map(pack_row)
        .collect();

    Ok(Page::from_rows(vertical_dpi, rows))
}

fn pack_row(gray: &[u8]) -> Vec<u8> {
    let mut row = vec![0u8; gray.len().div_ceil(8)];
    for (x, &pixel) in gray.iter().enumerate() {
        if pixel < 128 {
            row[x / 8] |= 0x80 >> (x % 8);
        }
    }
    row
}

fn convert_to_grayscale(buf: &[u8], color_type: ColorType) -> Result<Vec<u8>> {
    fn blend(value: u8, alpha: u8) -> u32 {
        let alpha = alpha as f32 / 255.0;
        (value as f32 * alpha + 255.0 * (1.0 - alpha)) as u32
    }

    match color_type {
        ColorType::Grayscale => Ok(buf.to_vec()),
        ColorType::GrayscaleAlpha => Ok(buf
            .chunks(2)
            .map(|ga| blend(ga[0], ga[1]) as u8)
            .collect()),
        ColorType::Rgb => Ok(buf
            .chunks(3)
            .map(|rgb| ((rgb[0] as u32 + rgb[1] as u32 + rgb[2] as u32) / 3) as u8)
            .collect()),
        ColorType::Rgba => Ok(buf
            .chunks(4)
            .map(|rgba| {
                let r = blend(rgba[0], rgba[3]);
                let g = blend(rgba[1], rgba[3]);
                let b = blend(rgba[2], rgba[3]);
                ((r + g + b) / 3) as u8
            })
            .collect()),
        other => Err(Error::Image(format!("{:?} color type is not supported", other))),
    }
}
