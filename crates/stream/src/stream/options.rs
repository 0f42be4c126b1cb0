//! Option strings for OPEN, SEEK/POSITION and QUERY SEEK
//!
//! Each command has its own context struct and static rule table. The
//! tables only validate and record; turning a context into something the
//! stream acts on happens in the `decode` step, which also fills in
//! defaults.
//!
//! | command  | tokens |
//! |----------|--------|
//! | OPEN     | `READ WRITE BOTH APPEND REPLACE NOBUFFER BINARY RECLENGTH n SHARED SHAREREAD SHAREWRITE` |
//! | POSITION | `= < + -`, `READ WRITE`, `CHAR LINE`, offset |
//! | QUERY    | `SYS READ WRITE`, `CHAR LINE` |

use crate::command::{self, Action, CommandTable, KeywordRule, TokenStream, take_number};
use crate::config::ShareMode;
use crate::error::ParseError;

use super::{AccessMode, Discipline};

// ============================================================================
// OPEN
// ============================================================================

const ACCESS_READ: u32 = 0x1;
const ACCESS_WRITE: u32 = 0x2;
const ACCESS_BOTH: u32 = 0x4;

const POSITION_APPEND: u32 = 0x1;
const POSITION_REPLACE: u32 = 0x2;

const SHARE_BOTH: u32 = 0x1;
const SHARE_READ: u32 = 0x2;
const SHARE_WRITE: u32 = 0x4;

const BINARY: u32 = 0x1;

#[derive(Debug, Default)]
struct OpenContext {
    access: u32,
    position: u32,
    share: u32,
    binary: u32,
    no_buffer: bool,
    record_length: Option<u64>,
}

fn access(c: &mut OpenContext) -> &mut u32 {
    &mut c.access
}
fn position(c: &mut OpenContext) -> &mut u32 {
    &mut c.position
}
fn share(c: &mut OpenContext) -> &mut u32 {
    &mut c.share
}
fn binary(c: &mut OpenContext) -> &mut u32 {
    &mut c.binary
}
fn no_buffer(c: &mut OpenContext) -> &mut bool {
    &mut c.no_buffer
}

fn record_length(
    rule: &KeywordRule<OpenContext>,
    tokens: &mut TokenStream<'_>,
    ctx: &mut OpenContext,
) -> Result<(), ParseError> {
    if ctx.record_length.is_some() {
        return Err(ParseError::Rejected(rule.keyword.to_string()));
    }
    match take_number(tokens) {
        Some(n) if n >= 1 => {
            ctx.record_length = Some(n);
            Ok(())
        }
        _ => Err(ParseError::MissingValue(rule.keyword.to_string())),
    }
}

static OPEN_RULES: [KeywordRule<OpenContext>; 11] = [
    KeywordRule {
        keyword: "READ",
        min_len: 1,
        actions: &[
            Action::ExclusiveInt(access),
            Action::OnlyBits(position, 0),
            Action::SetInt(access, ACCESS_READ),
        ],
    },
    KeywordRule {
        keyword: "WRITE",
        min_len: 1,
        actions: &[Action::ExclusiveInt(access), Action::SetInt(access, ACCESS_WRITE)],
    },
    KeywordRule {
        keyword: "BOTH",
        min_len: 1,
        actions: &[Action::ExclusiveInt(access), Action::SetInt(access, ACCESS_BOTH)],
    },
    KeywordRule {
        keyword: "APPEND",
        min_len: 1,
        actions: &[
            Action::ExclusiveInt(position),
            Action::OnlyBits(access, ACCESS_WRITE | ACCESS_BOTH),
            Action::SetInt(position, POSITION_APPEND),
        ],
    },
    KeywordRule {
        keyword: "REPLACE",
        min_len: 3,
        actions: &[
            Action::ExclusiveInt(position),
            Action::OnlyBits(access, ACCESS_WRITE | ACCESS_BOTH),
            Action::SetInt(position, POSITION_REPLACE),
        ],
    },
    KeywordRule {
        keyword: "NOBUFFER",
        min_len: 1,
        actions: &[Action::ExclusiveBool(no_buffer), Action::SetBool(no_buffer, true)],
    },
    KeywordRule {
        keyword: "BINARY",
        min_len: 2,
        actions: &[Action::ExclusiveInt(binary), Action::BitOr(binary, BINARY)],
    },
    KeywordRule {
        keyword: "RECLENGTH",
        min_len: 3,
        actions: &[Action::RequireBits(binary, BINARY), Action::Call(record_length)],
    },
    KeywordRule {
        keyword: "SHARED",
        min_len: 6,
        actions: &[Action::ExclusiveInt(share), Action::SetInt(share, SHARE_BOTH)],
    },
    KeywordRule {
        keyword: "SHAREREAD",
        min_len: 6,
        actions: &[Action::ExclusiveInt(share), Action::SetInt(share, SHARE_READ)],
    },
    KeywordRule {
        keyword: "SHAREWRITE",
        min_len: 6,
        actions: &[Action::ExclusiveInt(share), Action::SetInt(share, SHARE_WRITE)],
    },
];

static OPEN_TABLE: CommandTable<OpenContext> = CommandTable {
    rules: &OPEN_RULES,
    unknown: None,
};

/// A decoded OPEN option string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub access: AccessMode,
    /// Write cursor starts at the end of existing data
    pub append: bool,
    /// Existing data is discarded
    pub replace: bool,
    pub no_buffer: bool,
    pub discipline: Discipline,
    pub share: ShareMode,
}

impl OpenOptions {
    /// Decode `text`; an empty string means `BOTH APPEND`
    pub fn parse(text: &str, default_share: ShareMode) -> Result<Self, ParseError> {
        let mut ctx = OpenContext::default();
        command::parse(&OPEN_TABLE, text, &mut ctx)?;

        let access = match ctx.access {
            ACCESS_READ => AccessMode::ReadOnly,
            ACCESS_WRITE => AccessMode::WriteOnly,
            _ => AccessMode::ReadWrite,
        };
        let replace = ctx.position == POSITION_REPLACE;
        let discipline = if ctx.binary & BINARY != 0 {
            Discipline::FixedRecord(ctx.record_length.unwrap_or(1))
        } else {
            Discipline::VariableLine
        };
        let share = match ctx.share {
            SHARE_BOTH => ShareMode::ReadWrite,
            SHARE_READ => ShareMode::Read,
            SHARE_WRITE => ShareMode::Write,
            _ => default_share,
        };

        Ok(OpenOptions {
            access,
            append: access.writeable() && !replace,
            replace,
            no_buffer: ctx.no_buffer,
            discipline,
            share,
        })
    }
}

// ============================================================================
// POSITION
// ============================================================================

const FROM_START: u32 = 0x1;
const FROM_END: u32 = 0x2;
const FORWARD: u32 = 0x4;
const BACKWARD: u32 = 0x8;

const TARGET_READ: u32 = 0x1;
const TARGET_WRITE: u32 = 0x2;

const UNIT_CHAR: u32 = 0x1;
const UNIT_LINE: u32 = 0x2;

#[derive(Debug, Default)]
struct PositionContext {
    direction: u32,
    target: u32,
    unit: u32,
    offset: Option<u64>,
}

fn direction(c: &mut PositionContext) -> &mut u32 {
    &mut c.direction
}
fn position_target(c: &mut PositionContext) -> &mut u32 {
    &mut c.target
}
fn position_unit(c: &mut PositionContext) -> &mut u32 {
    &mut c.unit
}

/// Handles the bare offset; leaves anything non-numeric for the parser to reject
fn offset(
    rule: &KeywordRule<PositionContext>,
    tokens: &mut TokenStream<'_>,
    ctx: &mut PositionContext,
) -> Result<(), ParseError> {
    if let Some(n) = take_number(tokens) {
        if ctx.offset.is_some() {
            return Err(ParseError::Rejected(rule.keyword.to_string()));
        }
        ctx.offset = Some(n);
    }
    Ok(())
}

static POSITION_RULES: [KeywordRule<PositionContext>; 8] = [
    KeywordRule {
        keyword: "=",
        min_len: 1,
        actions: &[Action::ExclusiveInt(direction), Action::SetInt(direction, FROM_START)],
    },
    KeywordRule {
        keyword: "<",
        min_len: 1,
        actions: &[Action::ExclusiveInt(direction), Action::SetInt(direction, FROM_END)],
    },
    KeywordRule {
        keyword: "+",
        min_len: 1,
        actions: &[Action::ExclusiveInt(direction), Action::SetInt(direction, FORWARD)],
    },
    KeywordRule {
        keyword: "-",
        min_len: 1,
        actions: &[Action::ExclusiveInt(direction), Action::SetInt(direction, BACKWARD)],
    },
    KeywordRule {
        keyword: "READ",
        min_len: 1,
        actions: &[
            Action::ExclusiveInt(position_target),
            Action::SetInt(position_target, TARGET_READ),
        ],
    },
    KeywordRule {
        keyword: "WRITE",
        min_len: 1,
        actions: &[
            Action::ExclusiveInt(position_target),
            Action::SetInt(position_target, TARGET_WRITE),
        ],
    },
    KeywordRule {
        keyword: "CHAR",
        min_len: 1,
        actions: &[Action::ExclusiveInt(position_unit), Action::SetInt(position_unit, UNIT_CHAR)],
    },
    KeywordRule {
        keyword: "LINE",
        min_len: 1,
        actions: &[Action::ExclusiveInt(position_unit), Action::SetInt(position_unit, UNIT_LINE)],
    },
];

static OFFSET: KeywordRule<PositionContext> = KeywordRule {
    keyword: "offset",
    min_len: 0,
    actions: &[Action::Call(offset)],
};

static POSITION_TABLE: CommandTable<PositionContext> = CommandTable {
    rules: &POSITION_RULES,
    unknown: Some(&OFFSET),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    FromStart,
    FromEnd,
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Char,
    Line,
}

/// Which cursor(s) a position command moves or a query reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Read,
    Write,
    /// Both cursors, as far as the access mode allows
    Both,
    /// The OS file pointer (queries only)
    System,
}

/// A decoded SEEK/POSITION option string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub direction: Direction,
    pub target: Target,
    pub unit: Unit,
    pub offset: u64,
}

impl PositionRequest {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut ctx = PositionContext::default();
        command::parse(&POSITION_TABLE, text, &mut ctx)?;

        let offset = ctx
            .offset
            .ok_or_else(|| ParseError::MissingValue("offset".to_string()))?;
        let direction = match ctx.direction {
            FROM_END => Direction::FromEnd,
            FORWARD => Direction::Forward,
            BACKWARD => Direction::Backward,
            _ => Direction::FromStart,
        };
        let target = match ctx.target {
            TARGET_READ => Target::Read,
            TARGET_WRITE => Target::Write,
            _ => Target::Both,
        };
        let unit = match ctx.unit {
            UNIT_LINE => Unit::Line,
            _ => Unit::Char,
        };
        Ok(PositionRequest {
            direction,
            target,
            unit,
            offset,
        })
    }
}

// ============================================================================
// QUERY SEEK
// ============================================================================

const QUERY_SYS: u32 = 0x1;
const QUERY_READ: u32 = 0x2;
const QUERY_WRITE: u32 = 0x4;

#[derive(Debug, Default)]
struct QueryContext {
    target: u32,
    unit: u32,
}

fn query_target(c: &mut QueryContext) -> &mut u32 {
    &mut c.target
}
fn query_unit(c: &mut QueryContext) -> &mut u32 {
    &mut c.unit
}

static QUERY_RULES: [KeywordRule<QueryContext>; 5] = [
    KeywordRule {
        keyword: "SYS",
        min_len: 1,
        actions: &[
            Action::ExclusiveInt(query_target),
            Action::OnlyBits(query_unit, UNIT_CHAR),
            Action::SetInt(query_target, QUERY_SYS),
        ],
    },
    KeywordRule {
        keyword: "READ",
        min_len: 1,
        actions: &[Action::ExclusiveInt(query_target), Action::SetInt(query_target, QUERY_READ)],
    },
    KeywordRule {
        keyword: "WRITE",
        min_len: 1,
        actions: &[Action::ExclusiveInt(query_target), Action::SetInt(query_target, QUERY_WRITE)],
    },
    KeywordRule {
        keyword: "CHAR",
        min_len: 1,
        actions: &[Action::ExclusiveInt(query_unit), Action::SetInt(query_unit, UNIT_CHAR)],
    },
    KeywordRule {
        keyword: "LINE",
        min_len: 1,
        actions: &[
            Action::ExclusiveInt(query_unit),
            Action::OnlyBits(query_target, QUERY_READ | QUERY_WRITE),
            Action::SetInt(query_unit, UNIT_LINE),
        ],
    },
];

static QUERY_TABLE: CommandTable<QueryContext> = CommandTable {
    rules: &QUERY_RULES,
    unknown: None,
};

/// A decoded QUERY SEEK/POSITION option string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionQuery {
    pub target: Target,
    pub unit: Unit,
}

impl PositionQuery {
    /// Defaults to the read cursor in characters
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut ctx = QueryContext::default();
        command::parse(&QUERY_TABLE, text, &mut ctx)?;

        let target = match ctx.target {
            QUERY_SYS => Target::System,
            QUERY_WRITE => Target::Write,
            _ => Target::Read,
        };
        let unit = match ctx.unit {
            UNIT_LINE => Unit::Line,
            _ => Unit::Char,
        };
        Ok(PositionQuery { target, unit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(text: &str) -> Result<OpenOptions, ParseError> {
        OpenOptions::parse(text, ShareMode::ReadWrite)
    }

    #[test]
    fn test_open_defaults_to_both_append() {
        let opts = open("").unwrap();
        assert_eq!(opts.access, AccessMode::ReadWrite);
        assert!(opts.append);
        assert!(!opts.replace);
        assert_eq!(opts.discipline, Discipline::VariableLine);
        assert_eq!(opts.share, ShareMode::ReadWrite);
    }

    #[test]
    fn test_open_access_modes_exclusive() {
        assert!(matches!(open("READ WRITE"), Err(ParseError::Rejected(_))));
        assert!(matches!(open("WRITE BOTH"), Err(ParseError::Rejected(_))));
        assert!(matches!(open("b r"), Err(ParseError::Rejected(_))));

        let opts = open("BOTH APPEND").unwrap();
        assert_eq!(opts.access, AccessMode::ReadWrite);
        assert!(opts.append);
    }

    #[test]
    fn test_open_append_replace_exclusive() {
        assert!(open("WRITE APPEND REPLACE").is_err());
        assert!(open("REPLACE APPEND").is_err());
        let opts = open("write rep").unwrap();
        assert_eq!(opts.access, AccessMode::WriteOnly);
        assert!(opts.replace);
        assert!(!opts.append);
    }

    #[test]
    fn test_open_read_rejects_positioning() {
        assert!(open("READ APPEND").is_err());
        assert!(open("REPLACE READ").is_err());
        assert!(!open("READ").unwrap().append);
    }

    #[test]
    fn test_open_binary_record_length() {
        let opts = open("BINARY RECLENGTH 80").unwrap();
        assert_eq!(opts.discipline, Discipline::FixedRecord(80));
        assert_eq!(open("bi").unwrap().discipline, Discipline::FixedRecord(1));

        assert!(matches!(open("RECLENGTH 80 BINARY"), Err(ParseError::Rejected(_))));
        assert!(matches!(open("BINARY RECLENGTH"), Err(ParseError::MissingValue(_))));
        assert!(matches!(open("BINARY RECLENGTH 0"), Err(ParseError::MissingValue(_))));
        assert!(open("BINARY RECLENGTH 4 RECLENGTH 8").is_err());
    }

    #[test]
    fn test_open_share_needs_six_letters() {
        assert!(matches!(open("SHARE"), Err(ParseError::Ambiguous(_))));
        assert_eq!(open("SHARER").unwrap().share, ShareMode::Read);
        assert_eq!(open("sharewrite").unwrap().share, ShareMode::Write);
        assert_eq!(open("SHARED").unwrap().share, ShareMode::ReadWrite);
        assert_eq!(
            OpenOptions::parse("", ShareMode::Exclusive).unwrap().share,
            ShareMode::Exclusive
        );
    }

    #[test]
    fn test_open_nobuffer_once() {
        assert!(open("NOBUFFER").unwrap().no_buffer);
        assert!(open("NOBUFFER NOBUFFER").is_err());
        assert!(matches!(open("BOGUS"), Err(ParseError::Unrecognized(_))));
    }

    #[test]
    fn test_position_parse() {
        let req = PositionRequest::parse("= 5 LINE READ").unwrap();
        assert_eq!(
            req,
            PositionRequest {
                direction: Direction::FromStart,
                target: Target::Read,
                unit: Unit::Line,
                offset: 5,
            }
        );

        let req = PositionRequest::parse("-3").unwrap();
        assert_eq!(req.direction, Direction::Backward);
        assert_eq!(req.target, Target::Both);
        assert_eq!(req.unit, Unit::Char);
        assert_eq!(req.offset, 3);

        let req = PositionRequest::parse("<0 w").unwrap();
        assert_eq!(req.direction, Direction::FromEnd);
        assert_eq!(req.target, Target::Write);
    }

    #[test]
    fn test_position_rejects_conflicts() {
        assert!(matches!(PositionRequest::parse("= + 1"), Err(ParseError::Rejected(_))));
        assert!(PositionRequest::parse("READ WRITE 1").is_err());
        assert!(PositionRequest::parse("CHAR LINE 1").is_err());
        assert!(PositionRequest::parse("1 2").is_err());
    }

    #[test]
    fn test_position_requires_offset() {
        assert_eq!(
            PositionRequest::parse("= LINE"),
            Err(ParseError::MissingValue("offset".into()))
        );
        assert!(matches!(
            PositionRequest::parse("= five"),
            Err(ParseError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_query_parse() {
        assert_eq!(
            PositionQuery::parse("").unwrap(),
            PositionQuery {
                target: Target::Read,
                unit: Unit::Char
            }
        );
        let q = PositionQuery::parse("WRITE LINE").unwrap();
        assert_eq!(q.target, Target::Write);
        assert_eq!(q.unit, Unit::Line);
        assert_eq!(PositionQuery::parse("sys").unwrap().target, Target::System);
    }

    #[test]
    fn test_query_sys_has_no_lines() {
        assert!(PositionQuery::parse("SYS LINE").is_err());
        assert!(PositionQuery::parse("LINE SYS").is_err());
    }
}
