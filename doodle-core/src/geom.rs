//! Integer world geometry: points, rects and the pixel rasterizers used by strokes and collision.
//!
//! [`Rect`] always means `(x, y, width, height)` and covers the half-open span `[x, x+w) × [y, y+h)`.
//! The one place far-corner coordinates show up is [`crate::chunker::Chunker::world_size`], which
//! says so in its docs.

/// Integer division rounding towards negative infinity.
#[must_use]
pub fn floor_div(value: i32, divisor: i32) -> i32 {
    value.div_euclid(divisor)
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}
impl Point {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
    #[must_use]
    pub fn is_zero(self) -> bool {
        self == Self::ORIGIN
    }
}
impl std::ops::Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}
impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
impl std::ops::Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}
impl std::ops::SubAssign for Point {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}
impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PointParseError {
    #[error("expected {expected} comma separated integers, found {found}")]
    WrongArity { expected: usize, found: usize },
    #[error(transparent)]
    Value(#[from] std::num::ParseIntError),
}

fn parse_ints<const N: usize>(s: &str) -> Result<[i32; N], PointParseError> {
    let mut out = [0; N];
    let mut found = 0;
    for part in s.split(',') {
        if found < N {
            out[found] = part.trim().parse()?;
        }
        found += 1;
    }
    if found == N {
        Ok(out)
    } else {
        Err(PointParseError::WrongArity { expected: N, found })
    }
}

impl std::str::FromStr for Point {
    type Err = PointParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y] = parse_ints(s)?;
        Ok(Self { x, y })
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}
impl Rect {
    #[must_use]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
    /// A rect of the given size at the origin.
    #[must_use]
    pub const fn sized(w: i32, h: i32) -> Self {
        Self { x: 0, y: 0, w, h }
    }
    /// The rect spanned by two corners, in any order. Both corners are included.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
        let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
        Self::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1)
    }
    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
    /// The exclusive far corner, `(x + w, y + h)`.
    #[must_use]
    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.w, self.y + self.h)
    }
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.overlap(other).is_some()
    }
    /// The shared area of two rects, or `None` if they don't touch.
    #[must_use]
    pub fn overlap(&self, other: &Self) -> Option<Self> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.w).min(other.x + other.w);
        let y1 = (self.y + self.h).min(other.y + other.h);
        (x1 > x0 && y1 > y0).then(|| Self::new(x0, y0, x1 - x0, y1 - y0))
    }
    #[must_use = "returns a new rect and does not modify `self`"]
    pub fn translate(self, by: Point) -> Self {
        Self::new(self.x + by.x, self.y + by.y, self.w, self.h)
    }
    /// Grow outwards by `margin` on every side.
    #[must_use = "returns a new rect and does not modify `self`"]
    pub fn inflate(self, margin: i32) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.w + margin * 2,
            self.h + margin * 2,
        )
    }
    /// Every point inside, row by row.
    pub fn points(self) -> impl Iterator<Item = Point> {
        (self.y..self.y + self.h)
            .flat_map(move |y| (self.x..self.x + self.w).map(move |x| Point::new(x, y)))
    }
}
impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.w, self.h)
    }
}
impl std::str::FromStr for Rect {
    type Err = PointParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y, w, h] = parse_ints(s)?;
        Ok(Self { x, y, w, h })
    }
}

/// Divide, rounding half away from zero. `divisor` must be positive.
fn round_div(numerator: i64, divisor: i64) -> i64 {
    if numerator >= 0 {
        (numerator * 2 + divisor) / (divisor * 2)
    } else {
        -((-numerator * 2 + divisor) / (divisor * 2))
    }
}

/// Digital differential analyzer walk from `from` to `to`, both ends included.
///
/// Visits `max(|dx|, |dy|) + 1` points, always starting on `from` and ending on `to`.
#[derive(Clone, Debug)]
pub struct Line {
    from: Point,
    dx: i64,
    dy: i64,
    steps: i64,
    next: i64,
}
impl Iterator for Line {
    type Item = Point;
    fn next(&mut self) -> Option<Point> {
        if self.next > self.steps {
            return None;
        }
        let i = self.next;
        self.next += 1;
        if self.steps == 0 {
            return Some(self.from);
        }
        // Both offsets are bounded by the i32 inputs, so narrowing back is lossless.
        let x = i64::from(self.from.x) + round_div(self.dx * i, self.steps);
        let y = i64::from(self.from.y) + round_div(self.dy * i, self.steps);
        Some(Point::new(x as i32, y as i32))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.steps + 1 - self.next).unwrap_or(0);
        (left, Some(left))
    }
}
impl ExactSizeIterator for Line {}

#[must_use]
pub fn iter_line(from: Point, to: Point) -> Line {
    let dx = i64::from(to.x) - i64::from(from.x);
    let dy = i64::from(to.y) - i64::from(from.y);
    Line {
        from,
        dx,
        dy,
        steps: dx.abs().max(dy.abs()),
        next: 0,
    }
}

/// The outline of the rect with corners `a` and `b`, each point once.
pub fn iter_rect(a: Point, b: Point) -> impl Iterator<Item = Point> {
    let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
    let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));

    let top = (x0..=x1).map(move |x| Point::new(x, y0));
    let bottom = (x0..=x1)
        .filter(move |_| y1 != y0)
        .map(move |x| Point::new(x, y1));
    let sides = (y0 + 1..y1).flat_map(move |y| {
        let right = (x1 != x0).then_some(Point::new(x1, y));
        std::iter::once(Point::new(x0, y)).chain(right)
    });
    top.chain(bottom).chain(sides)
}

/// Midpoint ellipse inscribed in the rect with corners `a` and `b`.
///
/// Degenerate (zero radius) ellipses collapse into their bounding outline.
#[must_use]
pub fn iter_ellipse(a: Point, b: Point) -> std::vec::IntoIter<Point> {
    let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
    let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
    let rx = i64::from((x1 - x0) / 2);
    let ry = i64::from((y1 - y0) / 2);
    if rx == 0 || ry == 0 {
        return iter_rect(a, b).collect::<Vec<_>>().into_iter();
    }
    let (cx, cy) = (i64::from(x0) + rx, i64::from(y0) + ry);

    let mut seen = hashbrown::HashSet::new();
    let mut out = Vec::new();
    let mut plot = |x: i64, y: i64| {
        for (sx, sy) in [(1, 1), (-1, 1), (1, -1), (-1, -1)] {
            // Bounded by the i32 corners.
            let p = Point::new((cx + sx * x) as i32, (cy + sy * y) as i32);
            if seen.insert(p) {
                out.push(p);
            }
        }
    };

    let (rx2, ry2) = (rx * rx, ry * ry);
    let (mut x, mut y) = (0i64, ry);
    let (mut px, mut py) = (0i64, 2 * rx2 * y);
    plot(x, y);

    // Region 1: slope shallower than -1.
    let mut p = ry2 - rx2 * ry + (rx2 + 2) / 4;
    while px < py {
        x += 1;
        px += 2 * ry2;
        if p < 0 {
            p += ry2 + px;
        } else {
            y -= 1;
            py -= 2 * rx2;
            p += ry2 + px - py;
        }
        plot(x, y);
    }

    // Region 2: steeper, step along y.
    let (fx, fy) = (x as f64 + 0.5, (y - 1) as f64);
    let mut p = ry2 as f64 * fx * fx + rx2 as f64 * fy * fy - (rx2 * ry2) as f64;
    while y > 0 {
        y -= 1;
        py -= 2 * rx2;
        if p > 0.0 {
            p += (rx2 - py) as f64;
        } else {
            x += 1;
            px += 2 * ry2;
            p += (rx2 - py + px) as f64;
        }
        plot(x, y);
    }

    out.into_iter()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn floor_division() {
        assert_eq!(floor_div(0, 128), 0);
        assert_eq!(floor_div(-1, 128), -1);
        assert_eq!(floor_div(127, 128), 0);
        assert_eq!(floor_div(128, 128), 1);
        assert_eq!(floor_div(-128, 128), -1);
        assert_eq!(floor_div(-129, 128), -2);
    }
    #[test]
    fn string_forms() {
        assert_eq!("12,-5".parse::<Point>(), Ok(Point::new(12, -5)));
        assert_eq!(Point::new(-3, 4).to_string(), "-3,4");
        assert_eq!("1,2,3,4".parse::<Rect>(), Ok(Rect::new(1, 2, 3, 4)));
        assert_eq!(Rect::new(1, 2, 3, 4).to_string(), "1,2,3,4");
        assert_eq!(
            "1,2,3".parse::<Point>(),
            Err(PointParseError::WrongArity {
                expected: 2,
                found: 3
            })
        );
        assert!(matches!(
            "x,2".parse::<Point>(),
            Err(PointParseError::Value(_))
        ));
    }
    #[test]
    fn rect_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.overlap(&b), Some(Rect::new(5, 5, 5, 5)));
        // Touching edges don't overlap.
        assert!(!a.intersects(&Rect::new(10, 0, 5, 5)));
        assert!(a.contains(Point::new(9, 9)));
        assert!(!a.contains(Point::new(10, 9)));
        assert_eq!(a.points().count(), 100);
    }
    #[test]
    fn line_endpoints() {
        let line: Vec<_> = iter_line(Point::new(0, 0), Point::new(5, 2)).collect();
        assert_eq!(line.len(), 6);
        assert_eq!(line.first(), Some(&Point::new(0, 0)));
        assert_eq!(line.last(), Some(&Point::new(5, 2)));

        let backwards: Vec<_> = iter_line(Point::new(3, 3), Point::new(-3, 3)).collect();
        assert_eq!(backwards.len(), 7);
        assert_eq!(backwards[6], Point::new(-3, 3));

        let single: Vec<_> = iter_line(Point::new(7, 7), Point::new(7, 7)).collect();
        assert_eq!(single, [Point::new(7, 7)]);
    }
    #[test]
    fn line_is_connected() {
        let line: Vec<_> = iter_line(Point::new(-10, 4), Point::new(13, -17)).collect();
        for pair in line.windows(2) {
            let d = pair[1] - pair[0];
            assert!(d.x.abs() <= 1 && d.y.abs() <= 1, "gap between {pair:?}");
        }
    }
    #[test]
    fn rect_outline() {
        let points: Vec<_> = iter_rect(Point::new(4, 4), Point::new(0, 0)).collect();
        // 5x5 border
        assert_eq!(points.len(), 16);
        let unique: hashbrown::HashSet<_> = points.iter().collect();
        assert_eq!(unique.len(), 16);
        assert!(points.contains(&Point::new(4, 2)));
        assert!(!points.contains(&Point::new(2, 2)));
    }
    #[test]
    fn ellipse_symmetric_and_bounded() {
        let (a, b) = (Point::new(0, 0), Point::new(20, 10));
        let points: Vec<_> = iter_ellipse(a, b).collect();
        assert!(!points.is_empty());
        let bounds = Rect::from_corners(a, b);
        for p in &points {
            assert!(bounds.contains(*p), "{p} escaped");
            // Mirror image across the center is present too.
            assert!(points.contains(&Point::new(20 - p.x, p.y)));
        }
        // Extremes are touched.
        assert!(points.contains(&Point::new(0, 5)));
        assert!(points.contains(&Point::new(10, 0)));
    }
}
