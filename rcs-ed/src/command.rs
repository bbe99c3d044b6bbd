use nom::{
    branch::alt,
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res},
    sequence::{preceded, tuple},
    Finish, IResult,
};

/// The header line of an ed command, before any add payload has been read.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Add { position: usize, count: usize },
    Delete { position: usize, count: usize },
}

impl Command {
    pub(crate) fn parse(line: &[u8]) -> Result<Self, String> {
        match Finish::finish(all_consuming(command)(line)) {
            Ok((_, command)) => Ok(command),
            Err(_) => Err(format!(
                "not an ed command: {:?}",
                String::from_utf8_lossy(line)
            )),
        }
    }
}

fn command(input: &[u8]) -> IResult<&[u8], Command> {
    let (input, (letter, position, count)) = tuple((
        alt((char('a'), char('d'))),
        number,
        preceded(char(' '), number),
    ))(input)?;

    Ok((
        input,
        match letter {
            'a' => Command::Add { position, count },
            _ => Command::Delete { position, count },
        },
    ))
}

fn number(input: &[u8]) -> IResult<&[u8], usize> {
    map_res(digit1, |digits: &[u8]| {
        String::from_utf8_lossy(digits).parse::<usize>()
    })(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            Command::parse(b"a2 3").unwrap(),
            Command::Add {
                position: 2,
                count: 3
            }
        );

        assert_eq!(
            Command::parse(b"d20 32121").unwrap(),
            Command::Delete {
                position: 20,
                count: 32121
            }
        );

        assert!(Command::parse(b"").is_err());
        assert!(Command::parse(b"a2 ").is_err());
        assert!(Command::parse(b"a2 3 trailing").is_err());
        assert!(Command::parse(b"c1 2").is_err());
        assert!(Command::parse(b"x").is_err());
    }
}
