use std::path::Path;
use crate::Result;
use crate::raw::solomon::Solomon;
use super::{
  ParseInstance,
  nom_prelude::*
};

#[derive(Debug, Copy, Clone)]
pub struct SolomonFmt<P>(pub P);

impl<P: AsRef<Path>> ParseInstance<SolomonFmt<P>> for Solomon {
  fn parse(path: SolomonFmt<P>) -> Result<Solomon> {
    let path = path.0.as_ref();
    let data = std::fs::read_to_string(path)?;
    parse_solomon_str(&data)
  }
}

/// Parse Solomon-format text directly. Kept separate from [`ParseInstance`]
/// so callers (and tests) can supply instance text without touching the
/// filesystem.
pub fn parse_solomon_str(data: &str) -> Result<Solomon> {
  match parsers::solomon(data).finish() {
    Ok((_, instance)) => Ok(instance),
    Err(e) => Err(
      anyhow::Error::msg(e.to_string())
    ),
  }
}

mod parsers {
  use super::*;
  use crate::parsers::common::*;

  // Layout:
  //   <name>
  //   VEHICLE
  //   NUMBER     CAPACITY
  //     25         200
  //   CUSTOMER
  //   CUST NO.  XCOORD.  YCOORD.  DEMAND  READY TIME  DUE DATE  SERVICE TIME
  //       0       35       35       0        0          230         0
  //       ...
  // Section banners and column headers carry no digits, so skipping to the
  // next digit lands on the next datum.
  pub fn solomon(input: &str) -> IResult<&str, Solomon, error::VerboseError<&str>> {
    let (input, _) = take_until("VEHICLE")(input)?;
    let (input, _) = tag("VEHICLE")(input)?;
    let (input, _) = till_digit(input)?;
    let (input, num_vehicles) = usize_(input)?;
    let (input, _) = multispace1(input)?;
    let (input, vehicle_capacity) = double(input)?;
    let (input, _) = take_until("CUSTOMER")(input)?;
    let (input, _) = tag("CUSTOMER")(input)?;
    let (mut input, _) = till_digit(input)?;

    //     1      41         49         10        161       171         10
    let mut parse_data_line = tuple((
      usize_::<error::VerboseError<&str>>, // ID
      preceded(space1, double), // x
      preceded(space1, double), // y
      preceded(space1, double), // demand
      preceded(space1, double), // tw start
      preceded(space1, double), // tw end
      preceded(space1, double), // service time
    ));

    let mut coords = Vec::new();
    let mut demand = Vec::new();
    let mut tw_start = Vec::new();
    let mut tw_end = Vec::new();
    let mut service_time = Vec::new();

    let mut k = 0;
    loop {
      let (i, (id, x, y, q, e, l, s)) = parse_data_line(input)?;
      debug_assert_eq!(id, k);
      k += 1;
      coords.push((x, y));
      demand.push(q);
      tw_start.push(e);
      tw_end.push(l);
      service_time.push(s);

      let (i, _) = multispace0(i)?;
      input = i;
      if input.is_empty() {
        break;
      }
    }

    Ok((input, Solomon {
      num_vehicles,
      vehicle_capacity,
      coords,
      demand,
      tw_start,
      tw_end,
      service_time,
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const C101_HEAD: &str = "\
C101

VEHICLE
NUMBER     CAPACITY
  25         200

CUSTOMER
CUST NO.  XCOORD.   YCOORD.    DEMAND   READY TIME  DUE DATE   SERVICE   TIME

    0      40         50          0          0       1236          0
    1      45         68         10        912        967         90
    2      45         70         30        825        870         90
";

  #[test]
  fn parse_head() -> Result<()> {
    let raw = parse_solomon_str(C101_HEAD)?;
    assert_eq!(raw.num_vehicles, 25);
    assert_eq!(raw.vehicle_capacity, 200.0);
    assert_eq!(raw.num_customers(), 2);
    assert_eq!(raw.coords[0], (40.0, 50.0));
    assert_eq!(raw.demand[2], 30.0);
    assert_eq!(raw.tw_start[1], 912.0);
    assert_eq!(raw.tw_end[1], 967.0);
    assert_eq!(raw.service_time[1], 90.0);
    Ok(())
  }

  #[test]
  fn truncate_keeps_depot() -> Result<()> {
    let mut raw = parse_solomon_str(C101_HEAD)?;
    raw.truncate(1);
    assert_eq!(raw.num_customers(), 1);
    assert_eq!(raw.coords[0], (40.0, 50.0));
    assert_eq!(raw.coords[1], (45.0, 68.0));
    Ok(())
  }

  #[test]
  fn reject_garbage() {
    assert!(parse_solomon_str("not a solomon file").is_err());
  }
}
