use super::nom_prelude::*;

pub fn usize_<'a, E>(input: &'a str) -> IResult<&'a str, usize, E>
  where
    E: ParseError<&'a str> + error::FromExternalError<&'a str, ParseIntError>
{
  map_res(digit1, usize::from_str)(input)
}

/// Skip everything up to (and not including) the next ASCII digit. Used to
/// step over section banners and column headers, none of which contain
/// digits in the Solomon layout.
pub fn till_digit<'a, E>(input: &'a str) -> IResult<&'a str, &'a str, E>
  where
    E: ParseError<&'a str>
{
  take_till(|c: char| c.is_ascii_digit())(input)
}
