use super::types::Mask;
use image::Luma;

/// Region of interest covering the road directly ahead.
///
/// Vertices run top-left, bottom-left, bottom-right, top-right. The bottom
/// edge lies on `y = height`, one row past the last pixel row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiPolygon {
    pub vertices: [(i32, i32); 4],
}

impl RoiPolygon {
    pub fn new(width: u32, height: u32, w_perc: f64, h_perc: f64) -> Self {
        let (w, h) = (f64::from(width), f64::from(height));
        let left = (w_perc * w) as i32;
        let right = ((1.0 - w_perc) * w) as i32;
        let top = (h_perc * h) as i32;
        let bottom = height as i32;
        Self {
            vertices: [(left, top), (left, bottom), (right, bottom), (right, top)],
        }
    }

    /// Horizontal span of the polygon on row `y`, inclusive, if the row crosses it.
    fn span(&self, y: i32) -> Option<(i32, i32)> {
        let mut lo = i32::MAX;
        let mut hi = i32::MIN;

        for i in 0..self.vertices.len() {
            let (x0, y0) = self.vertices[i];
            let (x1, y1) = self.vertices[(i + 1) % self.vertices.len()];
            if y < y0.min(y1) || y > y0.max(y1) {
                continue;
            }
            if y0 == y1 {
                lo = lo.min(x0.min(x1));
                hi = hi.max(x0.max(x1));
            } else {
                let t = f64::from(y - y0) / f64::from(y1 - y0);
                let x = f64::from(x0) + t * f64::from(x1 - x0);
                lo = lo.min(x.floor() as i32);
                hi = hi.max(x.ceil() as i32);
            }
        }

        (lo <= hi).then_some((lo, hi))
    }

    /// 255 inside the polygon (outline included), 0 elsewhere.
    pub fn mask(&self, width: u32, height: u32) -> Mask {
        let mut mask = Mask::new(width, height);
        if width == 0 || height == 0 {
            return mask;
        }

        for y in 0..height {
            let Some((lo, hi)) = self.span(y as i32) else {
                continue;
            };
            let lo = lo.max(0);
            let hi = hi.min(width as i32 - 1);
            for x in lo..=hi {
                mask.put_pixel(x as u32, y, Luma([255]));
            }
        }
        mask
    }
}

/// Intersect an edge map with a region mask of the same size.
pub fn apply_region(edges: &Mask, region: &Mask) -> Mask {
    let _span = tracing::debug_span!("region_mask").entered();
    debug_assert_eq!(edges.dimensions(), region.dimensions());

    let (width, height) = edges.dimensions();
    let data = edges
        .as_raw()
        .iter()
        .zip(region.as_raw().iter())
        .map(|(&e, &r)| e & r)
        .collect();
    Mask::from_raw(width, height, data).unwrap_or_else(|| Mask::new(width, height))
}

/// Zero every edge outside the region of interest for the given insets.
pub fn mask_region(edges: &Mask, w_perc: f64, h_perc: f64) -> Mask {
    let (width, height) = edges.dimensions();
    let region = RoiPolygon::new(width, height, w_perc, h_perc).mask(width, height);
    apply_region(edges, &region)
}
