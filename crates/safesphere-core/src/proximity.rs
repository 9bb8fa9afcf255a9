//! "Find everything within R km" queries shared by zones, weather and
//! disaster alerts.
//!
//! A query narrows candidates with a [`BoundingBox`], asks the storage
//! collaborator for what lies inside it, then keeps the active candidates whose
//! exact great-circle distance is within the radius, nearest first.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::future::Future;

use crate::error::{GeoError, ProximityError};
use crate::severity::Graded;
use crate::spatial::{BoundingBox, GeoPoint};

/// An entity with a position.
pub trait Located {
    fn location(&self) -> GeoPoint;
}

/// A query result annotated with its distance from the query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nearby<T> {
    #[serde(flatten)]
    pub item: T,
    /// Great-circle distance from the query point in meters
    pub distance_m: f64,
}

impl<T> Nearby<T> {
    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }

    pub fn into_inner(self) -> T {
        self.item
    }
}

impl<T: Located> Located for Nearby<T> {
    fn location(&self) -> GeoPoint {
        self.item.location()
    }
}

impl<T: Graded> Graded for Nearby<T> {
    type Scale = T::Scale;

    fn severity(&self) -> Self::Scale {
        self.item.severity()
    }
}

/// A validated proximity query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityQuery {
    center: GeoPoint,
    radius_km: f64,
    bbox: BoundingBox,
}

impl ProximityQuery {
    pub fn new(center: GeoPoint, radius_km: f64) -> Result<Self, GeoError> {
        let bbox = BoundingBox::around(center, radius_km)?;
        Ok(Self {
            center,
            radius_km,
            bbox,
        })
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Coarse filter to hand to the storage layer.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// Exact pass over fetched candidates.
    ///
    /// Drops inactive candidates and anything farther than the radius, then
    /// sorts nearest first. The sort is stable, so equal distances keep
    /// candidate order.
    pub fn resolve<T, A>(&self, candidates: Vec<T>, is_active: A) -> Vec<Nearby<T>>
    where
        T: Located,
        A: Fn(&T) -> bool,
    {
        let radius_m = self.radius_km * 1000.0;
        let fetched = candidates.len();

        let mut results: Vec<Nearby<T>> = candidates
            .into_iter()
            .filter(|candidate| is_active(candidate))
            .filter_map(|candidate| {
                let distance_m = self.center.distance_to(&candidate.location());
                (distance_m <= radius_m).then_some(Nearby {
                    item: candidate,
                    distance_m,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance_m
                .partial_cmp(&b.distance_m)
                .unwrap_or(Ordering::Equal)
        });

        tracing::debug!(
            lat = self.center.lat,
            lng = self.center.lng,
            radius_km = self.radius_km,
            fetched,
            matched = results.len(),
            "proximity query resolved"
        );
        results
    }
}

/// Find active entities within `radius_km` of `center`, nearest first.
///
/// `fetch_candidates` is called once with the bounding box. Its error is
/// returned as [`ProximityError::Fetch`], never as an empty result.
pub fn find_nearby<T, E, F, A>(
    center: GeoPoint,
    radius_km: f64,
    fetch_candidates: F,
    is_active: A,
) -> Result<Vec<Nearby<T>>, ProximityError<E>>
where
    T: Located,
    F: FnOnce(&BoundingBox) -> Result<Vec<T>, E>,
    A: Fn(&T) -> bool,
{
    let query = ProximityQuery::new(center, radius_km)?;
    let candidates = fetch_candidates(&query.bounding_box()).map_err(ProximityError::Fetch)?;
    Ok(query.resolve(candidates, is_active))
}

/// [`find_nearby`] for a storage collaborator that suspends.
pub async fn find_nearby_async<T, E, F, Fut, A>(
    center: GeoPoint,
    radius_km: f64,
    fetch_candidates: F,
    is_active: A,
) -> Result<Vec<Nearby<T>>, ProximityError<E>>
where
    T: Located,
    F: FnOnce(BoundingBox) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
    A: Fn(&T) -> bool,
{
    let query = ProximityQuery::new(center, radius_km)?;
    let candidates = fetch_candidates(query.bounding_box())
        .await
        .map_err(ProximityError::Fetch)?;
    Ok(query.resolve(candidates, is_active))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::offset_by_bearing;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Beacon {
        id: usize,
        at: GeoPoint,
        active: bool,
    }

    impl Located for Beacon {
        fn location(&self) -> GeoPoint {
            self.at
        }
    }

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    /// Beacons on rings around `center` at 0.5 km steps, every 30 degrees.
    fn rings(center: GeoPoint) -> Vec<Beacon> {
        let mut beacons = Vec::new();
        for ring in 1..=20 {
            for step in 0..12 {
                let (lat, lng) = offset_by_bearing(
                    center.lat,
                    center.lng,
                    ring as f64 * 500.0,
                    (step as f64 * 30.0).to_radians(),
                );
                beacons.push(Beacon {
                    id: beacons.len(),
                    at: point(lat, lng),
                    active: (ring + step) % 3 != 0,
                });
            }
        }
        beacons
    }

    /// Storage stand-in that honours the bounding box.
    fn store_fetch(
        beacons: &[Beacon],
    ) -> impl FnOnce(&BoundingBox) -> Result<Vec<Beacon>, String> + '_ {
        move |bbox| {
            Ok(beacons
                .iter()
                .filter(|b| bbox.contains(&b.at))
                .cloned()
                .collect())
        }
    }

    #[test]
    fn returns_exactly_the_active_beacons_in_radius_sorted() {
        for center in [point(40.7128, -74.0060), point(69.6, 18.9), point(-0.5, 179.99)] {
            let beacons = rings(center);
            let radius_km = 4.2;
            let found = find_nearby(center, radius_km, store_fetch(&beacons), |b| b.active)
                .unwrap();

            let mut expected: Vec<usize> = beacons
                .iter()
                .filter(|b| b.active && center.distance_to(&b.at) <= radius_km * 1000.0)
                .map(|b| b.id)
                .collect();
            let mut got: Vec<usize> = found.iter().map(|n| n.item.id).collect();
            expected.sort_unstable();
            got.sort_unstable();
            assert_eq!(got, expected, "mismatch around {center:?}");

            assert!(found.windows(2).all(|w| w[0].distance_m <= w[1].distance_m));
            assert!(found.iter().all(|n| n.distance_m <= radius_km * 1000.0));
        }
    }

    #[test]
    fn distance_is_annotated_in_meters_and_kilometers() {
        let center = point(10.0, 10.0);
        let beacons = vec![Beacon {
            id: 0,
            at: point(10.01, 10.0),
            active: true,
        }];
        let found = find_nearby(center, 5.0, store_fetch(&beacons), |_| true).unwrap();
        assert_eq!(found.len(), 1);
        let expected = center.distance_to(&beacons[0].at);
        assert_eq!(found[0].distance_m, expected);
        assert!((found[0].distance_km() - expected / 1000.0).abs() < 1e-12);
    }

    #[test]
    fn ties_keep_candidate_order() {
        let center = point(0.0, 0.0);
        let same = point(0.001, 0.0);
        let beacons: Vec<Beacon> = (0..5)
            .map(|id| Beacon {
                id,
                at: same,
                active: true,
            })
            .collect();
        let found = find_nearby(center, 1.0, store_fetch(&beacons), |_| true).unwrap();
        let ids: Vec<usize> = found.iter().map(|n| n.item.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn fetch_failure_is_not_an_empty_result() {
        let result = find_nearby(
            point(0.0, 0.0),
            1.0,
            |_: &BoundingBox| Err::<Vec<Beacon>, _>("database offline".to_string()),
            |_| true,
        );
        match result {
            Err(ProximityError::Fetch(message)) => assert_eq!(message, "database offline"),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_input_fails_before_fetching() {
        let called = Cell::new(false);
        let fetch = |_: &BoundingBox| {
            called.set(true);
            Ok::<Vec<Beacon>, String>(Vec::new())
        };
        let result = find_nearby(point(0.0, 0.0), 0.0, fetch, |_| true);
        assert!(matches!(
            result,
            Err(ProximityError::Invalid(GeoError::InvalidRadius(_)))
        ));
        assert!(!called.get());

        let bad_center = GeoPoint { lat: 91.0, lng: 0.0 };
        let result = find_nearby(bad_center, 1.0, store_fetch(&[]), |_| true);
        assert!(matches!(
            result,
            Err(ProximityError::Invalid(GeoError::InvalidLatitude(_)))
        ));
    }

    #[test]
    fn polar_query_finds_beacons_on_the_far_side() {
        let north_pole = point(90.0, 0.0);
        let beacons = vec![
            Beacon {
                id: 0,
                at: point(89.99, 179.0),
                active: true,
            },
            Beacon {
                id: 1,
                at: point(89.99, -90.0),
                active: true,
            },
        ];
        let found = find_nearby(north_pole, 2.0, store_fetch(&beacons), |_| true).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|n| n.distance_m.is_finite()));
    }

    #[tokio::test]
    async fn async_fetch_is_awaited_once() {
        let center = point(51.5, -0.12);
        let beacons = rings(center);
        let found = find_nearby_async(
            center,
            2.0,
            |bbox| {
                let inside: Vec<Beacon> = beacons
                    .iter()
                    .filter(|b| bbox.contains(&b.at))
                    .cloned()
                    .collect();
                async move { Ok::<_, String>(inside) }
            },
            |b: &Beacon| b.active,
        )
        .await
        .unwrap();
        assert!(!found.is_empty());
        assert!(found.iter().all(|n| n.distance_m <= 2000.0 && n.item.active));
    }
}
