use geo::algorithm::contains::Contains;
use geo::bounding_rect::BoundingRect;
use geo::{MultiPolygon, Point};
use rstar::{RTree, RTreeObject, AABB};

struct RegionEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Point → region lookup over a slice of boundaries. Returned indices refer
/// to the order the boundaries were given in.
pub struct RegionIndex<'a> {
    boundaries: Vec<&'a MultiPolygon<f64>>,
    tree: RTree<RegionEnvelope>,
}

impl<'a> RegionIndex<'a> {
    pub fn new<I>(boundaries: I) -> Self
    where
        I: IntoIterator<Item = &'a MultiPolygon<f64>>,
    {
        let boundaries: Vec<&MultiPolygon<f64>> = boundaries.into_iter().collect();

        // Empty geometries have no bounding rect and can never contain a point.
        let envelopes = boundaries.iter().enumerate().filter_map(|(index, boundary)| {
            boundary.bounding_rect().map(|rect| RegionEnvelope {
                index,
                aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            })
        }).collect();

        Self {
            boundaries,
            tree: RTree::bulk_load(envelopes),
        }
    }

    pub fn locate(&self, lon: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.index)
            .filter(|&index| self.boundaries[index].contains(&point))
            .min()
    }
}
