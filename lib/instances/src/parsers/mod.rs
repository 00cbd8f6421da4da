mod solomon;
pub use solomon::{parse_solomon_str, SolomonFmt};

mod nom_prelude {
  pub use nom::{
    IResult, Parser,
    error::{
      self,
      ParseError,
      FromExternalError,
    },
    sequence::*,
    multi::*,
    combinator::*,
    character::complete::*,
    bytes::complete::{tag, take_till, take_until},
    number::complete::double,
    Finish,
  };
  pub use std::str::FromStr;
  pub use std::num::ParseIntError;
}

mod common;

pub trait ParseInstance<Fmt>: Sized {
  fn parse(inputs: Fmt) -> crate::Result<Self>;
}
