use crate::{Error, Warning};
use std::collections::HashMap;

/// Parsed atlas: texture pages plus named packed regions.
#[derive(Clone, Debug)]
pub struct Atlas {
    pub pages: Vec<AtlasPage>,
    pub regions: HashMap<String, AtlasRegion>,
}

impl Atlas {
    /// Parses atlas text. Unsupported rotation values degrade to unrotated
    /// with a warning pushed to `warnings`; structural problems are fatal.
    pub fn parse(input: &str, warnings: &mut Vec<Warning>) -> Result<Self, Error> {
        parse_atlas(input, warnings)
    }

    pub fn region(&self, name: &str) -> Option<&AtlasRegion> {
        self.regions.get(name)
    }

    pub fn page_of(&self, region: &AtlasRegion) -> &AtlasPage {
        &self.pages[region.page]
    }
}

#[derive(Clone, Debug)]
pub struct AtlasPage {
    /// Image file name (the page header line).
    pub image: String,
    pub width: u32,
    pub height: u32,
    /// Pixel format; exporters before 4.1 always write it, newer ones may not.
    pub format: String,
    pub min_filter: String,
    pub mag_filter: String,
    pub repeat: AtlasRepeat,
    pub pma: Option<bool>,
    pub scale: f32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum AtlasRepeat {
    #[default]
    None,
    X,
    Y,
    Xy,
}

#[derive(Clone, Debug)]
pub struct AtlasRegion {
    pub name: String,
    /// Index into `Atlas::pages`.
    pub page: usize,
    /// 0 or 90 after parsing; anything else is normalized to 0 with a warning.
    pub degrees: u16,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasRegion {
    /// Maps a local offset `(lx, ly)` in region pixels (ly grows downward,
    /// matching the packed image) to normalized page UV. The v axis is
    /// flipped so v = 1 is the image top.
    ///
    /// For a 90-degree region the packed rect has swapped extents, so the
    /// local axes swap before offsetting and the v origin folds the packed
    /// width in.
    pub fn uv(&self, page: &AtlasPage, lx: f32, ly: f32) -> [f32; 2] {
        let page_w = page.width as f32;
        let page_h = page.height as f32;
        if self.degrees == 90 {
            let u = (self.x as f32 + ly) / page_w;
            let v = lx / page_h + 1.0 - (self.width as f32 + self.y as f32) / page_h;
            [u, v]
        } else {
            let u = (self.x as f32 + lx) / page_w;
            let v = 1.0 - (self.y as f32 + ly) / page_h;
            [u, v]
        }
    }

    /// Maps a normalized (u, v) authored inside the region (mesh UVs) to
    /// page UV by scaling to region pixels first.
    pub fn uv_normalized(&self, page: &AtlasPage, u: f32, v: f32) -> [f32; 2] {
        self.uv(page, u * self.width as f32, v * self.height as f32)
    }

    /// Page UVs of the region's four corners in quad order: top-left,
    /// top-right, bottom-left, bottom-right.
    pub fn corner_uvs(&self, page: &AtlasPage) -> [[f32; 2]; 4] {
        let w = self.width as f32;
        let h = self.height as f32;
        [
            self.uv(page, 0.0, 0.0),
            self.uv(page, w, 0.0),
            self.uv(page, 0.0, h),
            self.uv(page, w, h),
        ]
    }
}

/// A scalar literal from a `key: value` line. Values are typed by trial
/// parse, never evaluated: bool, then integer, then float, then bare string.
#[derive(Clone, Debug, PartialEq)]
enum Literal {
    Bool(bool),
    Int(i64),
    Float(f32),
    Str(String),
}

impl Literal {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "true" => return Literal::Bool(true),
            "false" => return Literal::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Literal::Int(i);
        }
        if let Ok(f) = raw.parse::<f32>() {
            return Literal::Float(f);
        }
        Literal::Str(raw.to_string())
    }
}

fn parse_values(value: &str) -> Vec<Literal> {
    value.split(',').map(Literal::parse).collect()
}

fn expect_pair_u32(values: &[Literal], key: &str) -> Result<(u32, u32), Error> {
    match values {
        [Literal::Int(a), Literal::Int(b)] if *a >= 0 && *b >= 0 => Ok((*a as u32, *b as u32)),
        _ => Err(Error::AtlasParse {
            message: format!("expected two non-negative integers for '{key}'"),
        }),
    }
}

fn parse_atlas(input: &str, warnings: &mut Vec<Warning>) -> Result<Atlas, Error> {
    let mut pages: Vec<AtlasPage> = Vec::new();
    let mut regions: HashMap<String, AtlasRegion> = HashMap::new();

    let mut current_region: Option<AtlasRegion> = None;
    let mut expect_new_page = true;
    let mut page_has_regions = false;

    let flush_region = |region: AtlasRegion,
                            regions: &mut HashMap<String, AtlasRegion>,
                            warnings: &mut Vec<Warning>| {
        let mut region = region;
        if region.degrees != 0 && region.degrees != 90 {
            warnings.push(Warning::UnsupportedAtlasRotation {
                region: region.name.clone(),
                degrees: region.degrees,
            });
            region.degrees = 0;
        }
        regions.insert(region.name.clone(), region);
    };

    for raw_line in input.lines() {
        let raw_line = raw_line.trim_end_matches(['\r', '\n']);
        if raw_line.trim().is_empty() {
            if let Some(region) = current_region.take() {
                flush_region(region, &mut regions, warnings);
                page_has_regions = true;
            }
            if !pages.is_empty() && page_has_regions {
                expect_new_page = true;
            }
            continue;
        }

        let indented = raw_line.starts_with(' ') || raw_line.starts_with('\t');
        let line = raw_line.trim();

        if pages.is_empty() || expect_new_page {
            pages.push(AtlasPage {
                image: line.to_string(),
                width: 0,
                height: 0,
                format: "RGBA8888".to_string(),
                min_filter: "Nearest".to_string(),
                mag_filter: "Nearest".to_string(),
                repeat: AtlasRepeat::None,
                pma: None,
                scale: 1.0,
            });
            current_region = None;
            expect_new_page = false;
            page_has_regions = false;
            continue;
        }
        let page_index = pages.len() - 1;

        if !indented && !line.contains(':') {
            if let Some(region) = current_region.take() {
                flush_region(region, &mut regions, warnings);
                page_has_regions = true;
            }
            current_region = Some(AtlasRegion {
                name: line.to_string(),
                page: page_index,
                degrees: 0,
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            });
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let values = parse_values(value);

        if let Some(region) = current_region.as_mut() {
            match key {
                "rotate" => region.degrees = parse_degrees(&values),
                "xy" => {
                    let (x, y) = expect_pair_u32(&values, "xy")?;
                    region.x = x;
                    region.y = y;
                }
                "size" => {
                    let (w, h) = expect_pair_u32(&values, "size")?;
                    region.width = w;
                    region.height = h;
                }
                // 4.1 encoding, collapses to xy/size.
                "bounds" => match values.as_slice() {
                    [
                        Literal::Int(x),
                        Literal::Int(y),
                        Literal::Int(w),
                        Literal::Int(h),
                    ] if *x >= 0 && *y >= 0 && *w >= 0 && *h >= 0 => {
                        region.x = *x as u32;
                        region.y = *y as u32;
                        region.width = *w as u32;
                        region.height = *h as u32;
                    }
                    _ => {
                        return Err(Error::AtlasParse {
                            message: format!("invalid bounds for region '{}'", region.name),
                        });
                    }
                },
                // orig/offset/split/index metadata is carried by some
                // exporters but has no bearing on UV resolution.
                _ => {}
            }
        } else {
            let page = &mut pages[page_index];
            match key {
                "size" => {
                    let (w, h) = expect_pair_u32(&values, "size")?;
                    page.width = w;
                    page.height = h;
                }
                "format" => {
                    if let [Literal::Str(s)] = values.as_slice() {
                        page.format = s.clone();
                    }
                }
                "filter" => match values.as_slice() {
                    [Literal::Str(min), Literal::Str(mag)] => {
                        page.min_filter = min.clone();
                        page.mag_filter = mag.clone();
                    }
                    [Literal::Str(both)] => {
                        page.min_filter = both.clone();
                        page.mag_filter = both.clone();
                    }
                    _ => {
                        return Err(Error::AtlasParse {
                            message: format!("invalid filter for page '{}'", page.image),
                        });
                    }
                },
                "repeat" => {
                    page.repeat = match values.as_slice() {
                        [Literal::Str(s)] if s == "x" => AtlasRepeat::X,
                        [Literal::Str(s)] if s == "y" => AtlasRepeat::Y,
                        [Literal::Str(s)] if s == "xy" => AtlasRepeat::Xy,
                        _ => AtlasRepeat::None,
                    };
                }
                "pma" => {
                    if let [Literal::Bool(b)] = values.as_slice() {
                        page.pma = Some(*b);
                    }
                }
                "scale" => {
                    page.scale = match values.as_slice() {
                        [Literal::Float(f)] if f.is_finite() => *f,
                        [Literal::Int(i)] => *i as f32,
                        _ => 1.0,
                    };
                }
                _ => {}
            }
        }
    }

    if let Some(region) = current_region.take() {
        flush_region(region, &mut regions, warnings);
    }

    if pages.is_empty() {
        return Err(Error::AtlasParse {
            message: "empty atlas".to_string(),
        });
    }
    for page in &pages {
        if page.width == 0 || page.height == 0 {
            return Err(Error::AtlasParse {
                message: format!("page '{}' is missing its size", page.image),
            });
        }
    }

    Ok(Atlas { pages, regions })
}

/// Legacy exporters write rotate as a boolean (true means 90 degrees); newer
/// ones write integer degrees.
fn parse_degrees(values: &[Literal]) -> u16 {
    match values {
        [Literal::Bool(true)] => 90,
        [Literal::Bool(false)] => 0,
        [Literal::Int(raw)] => {
            let mut normalized = (*raw % 360) as i32;
            if normalized < 0 {
                normalized += 360;
            }
            normalized as u16
        }
        _ => 0,
    }
}
