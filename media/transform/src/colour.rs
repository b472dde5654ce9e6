/*!
    Colour model conversion.

    Frames are split into one [`ComponentPlane`] per colour component,
    converted between grey, YUV and RGB at full resolution, and packed
    back into the target layout. YUV uses BT.601 limited range.
*/

use media_types::{Error, PixelFormat, Plane, Result, VideoFrame};

use crate::scale::ComponentPlane;

/// Chroma value of a colourless pixel.
const NEUTRAL_CHROMA: u8 = 128;

/**
    Colour model of a pixel format.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Family {
    Gray,
    Yuv,
    Rgb,
}

impl Family {
    pub(crate) fn of(format: PixelFormat) -> Self {
        match format {
            PixelFormat::Gray8 => Self::Gray,
            format if format.is_yuv() => Self::Yuv,
            _ => Self::Rgb,
        }
    }

    pub(crate) fn components(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Yuv | Self::Rgb => 3,
        }
    }
}

/**
    Byte offsets of R, G and B within one pixel, and the pixel size.
*/
fn rgb_layout(format: PixelFormat) -> Option<([usize; 3], usize)> {
    match format {
        PixelFormat::Rgb24 => Some(([0, 1, 2], 3)),
        PixelFormat::Bgr24 => Some(([2, 1, 0], 3)),
        PixelFormat::Rgba => Some(([0, 1, 2], 4)),
        PixelFormat::Bgra => Some(([2, 1, 0], 4)),
        _ => None,
    }
}

fn unsupported(format: PixelFormat) -> Error {
    Error::conversion_failed(format!("no component layout for {format}"))
}

/**
    Width and height of each component of a `width` x `height` frame.
*/
pub(crate) fn component_sizes(format: PixelFormat, width: u32, height: u32) -> Vec<(usize, usize)> {
    let luma = (width as usize, height as usize);
    match Family::of(format) {
        Family::Gray => vec![luma],
        Family::Yuv => {
            let (row_bytes, rows) = format.plane_size(1, width, height);
            // NV12 interleaves U and V in one plane
            let chroma_width = if format == PixelFormat::Nv12 {
                row_bytes / 2
            } else {
                row_bytes
            };
            vec![luma, (chroma_width, rows), (chroma_width, rows)]
        }
        Family::Rgb => vec![luma; 3],
    }
}

/**
    Split a frame into tightly packed component planes: Y, U, V or R, G, B.
*/
pub(crate) fn decompose(frame: &VideoFrame) -> Result<Vec<ComponentPlane>> {
    let sizes = component_sizes(frame.format, frame.width, frame.height);
    let packed = |plane: usize, (width, height): (usize, usize)| ComponentPlane {
        width,
        height,
        data: frame.packed_plane(plane),
    };

    match Family::of(frame.format) {
        Family::Gray => Ok(vec![packed(0, sizes[0])]),
        Family::Yuv if frame.format == PixelFormat::Nv12 => {
            let (width, height) = sizes[1];
            let mut u = ComponentPlane::filled(width, height, 0);
            let mut v = ComponentPlane::filled(width, height, 0);
            for y in 0..height {
                for (x, pair) in frame.row(1, y).chunks_exact(2).enumerate() {
                    u.data[y * width + x] = pair[0];
                    v.data[y * width + x] = pair[1];
                }
            }
            Ok(vec![packed(0, sizes[0]), u, v])
        }
        Family::Yuv => Ok((0..3).map(|plane| packed(plane, sizes[plane])).collect()),
        Family::Rgb => {
            let (offsets, pixel_size) =
                rgb_layout(frame.format).ok_or_else(|| unsupported(frame.format))?;
            let (width, height) = sizes[0];
            Ok(offsets
                .iter()
                .map(|&offset| {
                    let mut channel = ComponentPlane::filled(width, height, 0);
                    for y in 0..height {
                        let row = frame.row(0, y);
                        for x in 0..width {
                            channel.data[y * width + x] = row[x * pixel_size + offset];
                        }
                    }
                    channel
                })
                .collect())
        }
    }
}

/**
    Convert component planes from one colour model to another.

    Same-model input is returned as is. Otherwise every output component
    has the luma size `size`, with chroma upsampled by nearest neighbour.
*/
pub(crate) fn convert_family(
    mut planes: Vec<ComponentPlane>,
    from: Family,
    to: Family,
    size: (usize, usize),
) -> Vec<ComponentPlane> {
    let (width, height) = size;
    match (from, to) {
        (Family::Gray, Family::Gray) | (Family::Yuv, Family::Yuv) | (Family::Rgb, Family::Rgb) => {
            planes
        }
        (Family::Yuv, Family::Gray) => {
            planes.truncate(1);
            planes
        }
        (Family::Gray, Family::Yuv) => {
            planes.push(ComponentPlane::filled(width, height, NEUTRAL_CHROMA));
            planes.push(ComponentPlane::filled(width, height, NEUTRAL_CHROMA));
            planes
        }
        (Family::Gray, Family::Rgb) => {
            let yuv = convert_family(planes, Family::Gray, Family::Yuv, size);
            yuv_to_rgb(&yuv, size)
        }
        (Family::Yuv, Family::Rgb) => yuv_to_rgb(&planes, size),
        (Family::Rgb, Family::Yuv) => rgb_to_yuv(&planes, size, true),
        (Family::Rgb, Family::Gray) => rgb_to_yuv(&planes, size, false),
    }
}

#[inline]
fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

fn yuv_to_rgb(planes: &[ComponentPlane], (width, height): (usize, usize)) -> Vec<ComponentPlane> {
    let (luma, u, v) = (&planes[0], &planes[1], &planes[2]);
    let mut rgb = vec![ComponentPlane::filled(width, height, 0); 3];

    for y in 0..height {
        let cy = y * u.height / height;
        for x in 0..width {
            let cx = x * u.width / width;
            let c = i32::from(luma.at(x, y)) - 16;
            let d = i32::from(u.at(cx, cy)) - 128;
            let e = i32::from(v.at(cx, cy)) - 128;

            let i = y * width + x;
            rgb[0].data[i] = clamp_u8((298 * c + 409 * e + 128) >> 8);
            rgb[1].data[i] = clamp_u8((298 * c - 100 * d - 208 * e + 128) >> 8);
            rgb[2].data[i] = clamp_u8((298 * c + 516 * d + 128) >> 8);
        }
    }
    rgb
}

fn rgb_to_yuv(
    planes: &[ComponentPlane],
    (width, height): (usize, usize),
    with_chroma: bool,
) -> Vec<ComponentPlane> {
    let (r, g, b) = (&planes[0], &planes[1], &planes[2]);
    let mut luma = ComponentPlane::filled(width, height, 0);
    let mut u = ComponentPlane::filled(width, height, NEUTRAL_CHROMA);
    let mut v = ComponentPlane::filled(width, height, NEUTRAL_CHROMA);

    for i in 0..width * height {
        let (red, green, blue) = (
            i32::from(r.data[i]),
            i32::from(g.data[i]),
            i32::from(b.data[i]),
        );
        luma.data[i] = clamp_u8(((66 * red + 129 * green + 25 * blue + 128) >> 8) + 16);
        if with_chroma {
            u.data[i] = clamp_u8(((-38 * red - 74 * green + 112 * blue + 128) >> 8) + 128);
            v.data[i] = clamp_u8(((112 * red - 94 * green - 18 * blue + 128) >> 8) + 128);
        }
    }

    if with_chroma {
        vec![luma, u, v]
    } else {
        vec![luma]
    }
}

/**
    Pack component planes into a frame of `format` with tight strides.

    Packed formats with an alpha byte get an opaque alpha.
*/
pub(crate) fn compose(
    format: PixelFormat,
    width: u32,
    height: u32,
    components: Vec<ComponentPlane>,
) -> Result<VideoFrame> {
    let tight = |c: ComponentPlane| Plane::new(c.data, c.width);

    let planes = match Family::of(format) {
        Family::Gray | Family::Yuv if format != PixelFormat::Nv12 => {
            components.into_iter().map(tight).collect()
        }
        Family::Yuv => {
            let mut components = components.into_iter();
            let (Some(luma), Some(u), Some(v)) =
                (components.next(), components.next(), components.next())
            else {
                return Err(Error::conversion_failed("nv12 needs three components"));
            };
            let interleaved = u.data.iter().zip(&v.data).flat_map(|(&u, &v)| [u, v]).collect();
            vec![tight(luma), Plane::new(interleaved, u.width * 2)]
        }
        _ => {
            let (offsets, pixel_size) = rgb_layout(format).ok_or_else(|| unsupported(format))?;
            let (width, height) = (width as usize, height as usize);
            let mut data = vec![u8::MAX; width * height * pixel_size];
            for (channel, &offset) in components.iter().zip(&offsets) {
                for (i, &sample) in channel.data.iter().enumerate() {
                    data[i * pixel_size + offset] = sample;
                }
            }
            vec![Plane::new(data, width * pixel_size)]
        }
    };

    Ok(VideoFrame::from_planes(width, height, format, planes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_pixel(r: u8, g: u8, b: u8) -> Vec<ComponentPlane> {
        [r, g, b]
            .into_iter()
            .map(|value| ComponentPlane::filled(1, 1, value))
            .collect()
    }

    #[test]
    fn families() {
        assert_eq!(Family::of(PixelFormat::Gray8), Family::Gray);
        assert_eq!(Family::of(PixelFormat::Nv12), Family::Yuv);
        assert_eq!(Family::of(PixelFormat::Bgra), Family::Rgb);
        assert_eq!(Family::Gray.components(), 1);
    }

    #[test]
    fn nv12_components_have_chroma_size() {
        assert_eq!(
            component_sizes(PixelFormat::Nv12, 5, 3),
            vec![(5, 3), (3, 2), (3, 2)]
        );
        assert_eq!(component_sizes(PixelFormat::Rgba, 4, 2), vec![(4, 2); 3]);
    }

    #[test]
    fn limited_range_extremes() {
        let white = rgb_to_yuv(&rgb_pixel(255, 255, 255), (1, 1), true);
        assert_eq!(
            white.iter().map(|c| c.data[0]).collect::<Vec<_>>(),
            vec![235, 128, 128]
        );

        let black = rgb_to_yuv(&rgb_pixel(0, 0, 0), (1, 1), true);
        assert_eq!(black[0].data[0], 16);

        let back = yuv_to_rgb(&white, (1, 1));
        assert!(back.iter().all(|c| c.data[0] == 255));
    }

    #[test]
    fn grey_becomes_neutral_chroma() {
        let grey = vec![ComponentPlane::filled(2, 2, 90)];
        let yuv = convert_family(grey, Family::Gray, Family::Yuv, (2, 2));
        assert_eq!(yuv.len(), 3);
        assert!(yuv[1].data.iter().chain(&yuv[2].data).all(|&c| c == NEUTRAL_CHROMA));
    }

    #[test]
    fn packed_rgb_gets_opaque_alpha() {
        let frame = compose(PixelFormat::Bgra, 1, 1, rgb_pixel(255, 10, 0)).unwrap();
        assert_eq!(frame.plane(0).data, vec![0, 10, 255, 255]);
        assert_eq!(decompose(&frame).unwrap(), rgb_pixel(255, 10, 0));
    }
}
