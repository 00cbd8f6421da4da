use tracing::*;

use crate::Map;
use crate::data::{Node, VrptwInstance, VrptwInstanceExt};
use super::espptwc::EspptwcData;

/// Build the arc-filtered pricing data from a VRPTW instance. An arc
/// `(i, j)` is dropped when
///   - `i == j`, `j` is the origin depot, or `i` is the destination depot,
///   - `d_i + d_j > Q`, or
///   - `a_i + tau_ij > b_j` (departing at the earliest opportunity already
///     misses the window at `j`; `tau` absorbs the service time at `i`).
#[instrument(level = "debug", skip(data), fields(id = %data.id))]
pub fn build_pricing_data(data: &VrptwInstance) -> EspptwcData {
    let mut cost: Map<(Node, Node), f64> = Map::default();
    let mut travel_time: Map<(Node, Node), f64> = Map::default();

    let mut total_arcs = 0usize;
    for &i in &data.N {
        for &j in &data.N {
            if i == j || j == data.o_depot || i == data.d_depot {
                continue;
            }
            total_arcs += 1;

            if data.demand[&i] + data.demand[&j] > data.capacity {
                trace!(i, j, "arc dropped: capacity");
                continue;
            }
            let tau = data.travel_time[&(i, j)];
            if data.tw_start[&i] + tau > data.tw_end[&j] {
                trace!(i, j, "arc dropped: time windows");
                continue;
            }

            cost.insert((i, j), data.cost[&(i, j)]);
            travel_time.insert((i, j), tau);
        }
    }

    let kept = cost.len();
    debug!(
        total_arcs,
        kept,
        ratio_filtered = 1.0 - kept as f64 / total_arcs.max(1) as f64,
        "arc filter finished"
    );

    let demand = data.N.iter().map(|i| data.demand[i]).collect();
    let tw_start = data.N.iter().map(|i| data.tw_start[i]).collect();
    let tw_end = data.N.iter().map(|i| data.tw_end[i]).collect();

    debug_assert!(data.N.iter().all(|&i| !data.is_customer(i) || data.demand[&i] <= data.capacity));

    EspptwcData::new(
        data.n as usize,
        data.capacity,
        cost,
        travel_time,
        demand,
        tw_start,
        tw_end,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::espprc::model::PricingData;
    use instances::dataset::vrptw::from_solomon_str;

    const TOY: &str = "\
TOY

VEHICLE
NUMBER     CAPACITY
   2          10

CUSTOMER
CUST NO.  XCOORD.   YCOORD.    DEMAND   READY TIME  DUE DATE   SERVICE   TIME

    0       0          0          0          0        100          0
    1       3          4          4         0          50          2
    2       6          0          5        10          60          3
    3       6          8          6        90          95          0
";

    #[test]
    fn depot_and_self_arcs_removed() {
        let inst = from_solomon_str(TOY, "toy", None).unwrap();
        let data = build_pricing_data(&inst);
        assert!(data.true_cost(1, 1).is_none());
        assert!(data.true_cost(1, 0).is_none());
        assert!(data.true_cost(4, 1).is_none());
        assert!(data.true_cost(0, 4).is_some());
    }

    #[test]
    fn capacity_filter() {
        let inst = from_solomon_str(TOY, "toy", None).unwrap();
        let data = build_pricing_data(&inst);
        // 5 + 6 > 10 kills both orientations between customers 2 and 3
        assert!(data.true_cost(2, 3).is_none());
        assert!(data.true_cost(3, 2).is_none());
        assert!(data.true_cost(1, 2).is_some());
    }

    #[test]
    fn window_filter() {
        let inst = from_solomon_str(TOY, "toy", None).unwrap();
        let data = build_pricing_data(&inst);
        // 3 cannot precede 1: a_3 + tau > b_1 (90 + anything > 50)
        assert!(data.true_cost(3, 1).is_none());
        assert!(data.true_cost(1, 3).is_some());
    }

    #[test]
    fn neighbours_sorted() {
        let inst = from_solomon_str(TOY, "toy", None).unwrap();
        let data = build_pricing_data(&inst);
        for i in 0..5u16 {
            let adj = data.neighbours(i);
            assert!(adj.windows(2).all(|w| w[0] < w[1]), "unsorted neighbours at {}: {:?}", i, adj);
        }
    }
}
