//! Tree form of function bodies.
//!
//! The decoder produces flat instruction sequences with inline `else`/`end`
//! markers. Before execution, [`build`] folds each body into a tree in which
//! every `block`, `loop`, and `if` owns its child instructions, so branch
//! targets are explicit and the interpreter never scans for matching `end`s.

use thiserror::Error;

use crate::decoder::instruction::{BlockType, Instr};

/// Malformed block nesting. Validation rejects such bodies first; this error
/// surfaces only when structuring an unvalidated instruction sequence.
#[derive(Debug, Error, PartialEq)]
pub enum StructureError {
    #[error("instruction sequence ended without a closing end")]
    MissingEnd,

    #[error("else without an enclosing if")]
    MisplacedElse,

    #[error("trailing instructions after the closing end")]
    TrailingInstructions,
}

/// One node of the control-flow tree.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredInstr {
    /// Any instruction without nested structure.
    Plain(Instr),

    /// `block ... end`; branches to it jump past the end.
    Block {
        block_type: BlockType,
        body: Vec<StructuredInstr>,
    },

    /// `loop ... end`; branches to it jump back to the start.
    Loop {
        block_type: BlockType,
        body: Vec<StructuredInstr>,
    },

    /// `if ... else ... end`.
    If {
        block_type: BlockType,
        then_branch: Vec<StructuredInstr>,
        else_branch: Option<Vec<StructuredInstr>>,
    },
}

/// How a nested sequence was terminated.
enum Terminator {
    End,
    Else,
}

/// Build the control-flow tree for a flat body (terminated by its `end`).
pub fn build(instrs: &[Instr]) -> Result<Vec<StructuredInstr>, StructureError> {
    let mut pos = 0;
    let (body, terminator) = parse_seq(instrs, &mut pos)?;
    match terminator {
        Terminator::End if pos == instrs.len() => Ok(body),
        Terminator::End => Err(StructureError::TrailingInstructions),
        Terminator::Else => Err(StructureError::MisplacedElse),
    }
}

fn parse_seq(
    instrs: &[Instr],
    pos: &mut usize,
) -> Result<(Vec<StructuredInstr>, Terminator), StructureError> {
    let mut out = Vec::new();
    while let Some(instr) = instrs.get(*pos) {
        *pos += 1;
        match instr {
            Instr::End => return Ok((out, Terminator::End)),
            Instr::Else => return Ok((out, Terminator::Else)),

            Instr::Block { block_type } => {
                let (body, terminator) = parse_seq(instrs, pos)?;
                match terminator {
                    Terminator::End => out.push(StructuredInstr::Block {
                        block_type: *block_type,
                        body,
                    }),
                    Terminator::Else => return Err(StructureError::MisplacedElse),
                }
            }

            Instr::Loop { block_type } => {
                let (body, terminator) = parse_seq(instrs, pos)?;
                match terminator {
                    Terminator::End => out.push(StructuredInstr::Loop {
                        block_type: *block_type,
                        body,
                    }),
                    Terminator::Else => return Err(StructureError::MisplacedElse),
                }
            }

            Instr::If { block_type } => {
                let (then_branch, terminator) = parse_seq(instrs, pos)?;
                let else_branch = match terminator {
                    Terminator::End => None,
                    Terminator::Else => {
                        let (else_body, terminator) = parse_seq(instrs, pos)?;
                        match terminator {
                            Terminator::End => Some(else_body),
                            Terminator::Else => return Err(StructureError::MisplacedElse),
                        }
                    }
                };
                out.push(StructuredInstr::If {
                    block_type: *block_type,
                    then_branch,
                    else_branch,
                });
            }

            plain => out.push(StructuredInstr::Plain(plain.clone())),
        }
    }
    Err(StructureError::MissingEnd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_body() {
        let instrs = vec![Instr::I32Const { value: 42 }, Instr::End];
        let tree = build(&instrs).unwrap();
        assert_eq!(
            tree,
            vec![StructuredInstr::Plain(Instr::I32Const { value: 42 })]
        );
    }

    #[test]
    fn nested_block() {
        let instrs = vec![
            Instr::Block {
                block_type: BlockType::Empty,
            },
            Instr::Nop,
            Instr::End,
            Instr::I32Const { value: 1 },
            Instr::End,
        ];
        let tree = build(&instrs).unwrap();
        assert_eq!(tree.len(), 2);
        match &tree[0] {
            StructuredInstr::Block { body, .. } => {
                assert_eq!(body, &vec![StructuredInstr::Plain(Instr::Nop)]);
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn if_with_else() {
        let instrs = vec![
            Instr::If {
                block_type: BlockType::Empty,
            },
            Instr::Nop,
            Instr::Else,
            Instr::Unreachable,
            Instr::End,
            Instr::End,
        ];
        let tree = build(&instrs).unwrap();
        match &tree[0] {
            StructuredInstr::If {
                then_branch,
                else_branch,
                ..
            } => {
                assert_eq!(then_branch.len(), 1);
                assert_eq!(
                    else_branch.as_deref(),
                    Some(&[StructuredInstr::Plain(Instr::Unreachable)][..])
                );
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn if_without_else() {
        let instrs = vec![
            Instr::If {
                block_type: BlockType::Empty,
            },
            Instr::Nop,
            Instr::End,
            Instr::End,
        ];
        let tree = build(&instrs).unwrap();
        match &tree[0] {
            StructuredInstr::If { else_branch, .. } => assert!(else_branch.is_none()),
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn missing_end_is_rejected() {
        let instrs = vec![Instr::Block {
            block_type: BlockType::Empty,
        }];
        assert_eq!(build(&instrs), Err(StructureError::MissingEnd));
    }

    #[test]
    fn stray_else_is_rejected() {
        let instrs = vec![Instr::Else, Instr::End];
        assert_eq!(build(&instrs), Err(StructureError::MisplacedElse));
    }
}
