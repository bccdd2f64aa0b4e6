use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::io;

/// Axis-aligned bounding box of a feature or of everything below a tree node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn from_point(x: f64, y: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    /// Smallest envelope covering all `(x, y)` pairs, if any
    pub fn from_coordinates(coordinates: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        coordinates
            .into_iter()
            .map(|(x, y)| Self::from_point(x, y))
            .reduce(|acc, point| acc.expand(&point))
    }

    pub fn expand(&self, other: &Envelope) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        for ordinate in [self.min_x, self.min_y, self.max_x, self.max_y] {
            writer.write_f64::<NetworkEndian>(ordinate)?;
        }
        Ok(())
    }

    pub fn read_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        Ok(Self {
            min_x: reader.read_f64::<NetworkEndian>()?,
            min_y: reader.read_f64::<NetworkEndian>()?,
            max_x: reader.read_f64::<NetworkEndian>()?,
            max_y: reader.read_f64::<NetworkEndian>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_covers_every_coordinate() {
        let envelope =
            Envelope::from_coordinates([(1.0, 5.0), (-2.0, 3.0), (4.0, -1.0)]).unwrap();

        assert_eq!(
            envelope,
            Envelope {
                min_x: -2.0,
                min_y: -1.0,
                max_x: 4.0,
                max_y: 5.0
            }
        );
        assert!(envelope.intersects(&Envelope::from_point(0.0, 0.0)));
        assert!(!envelope.intersects(&Envelope::from_point(10.0, 0.0)));
    }

    #[test]
    fn no_coordinates_means_no_envelope() {
        assert_eq!(Envelope::from_coordinates(Vec::new()), None);
    }
}
