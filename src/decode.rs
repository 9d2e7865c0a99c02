//! Instruction decoder
//!
//! A total function from a 32-bit little-endian instruction word to a
//! decoded [`Instr`]. The two low bits of the word select the encoding
//! family: quadrants 0, 1 and 2 are 16-bit compressed instructions
//! (the upper half of the fetched word is ignored), quadrant 3 is the
//! full-width encoding. Compressed forms are rewritten into their
//! full-width equivalents so the interpreter only ever sees one
//! operation set.
//!
//! Immediate bits are permuted across the instruction word in a
//! format-specific way; each `*_read` function below reassembles one
//! format and sign-extends at the width that format defines.

use thiserror::Error;

use crate::instr::{reg, Instr, InstrType};
use crate::utils::{extract_field, sign_extend};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The encoding falls outside the supported RV64IMFDC subset
    #[error("unsupported or invalid instruction 0x{data:08x}")]
    IllegalInstruction { data: u32 },
    /// A structurally recognized encoding with reserved operand
    /// values (zero immediate where nonzero is required, x0 where a
    /// real register is required, a nonzero selector field)
    #[error("malformed instruction 0x{data:08x}")]
    MalformedInstruction { data: u32 },
}

/// Makes a function called field_name which gets that field from a
/// 32-bit instruction word (bits data[end:start], verilog notation).
macro_rules! make_field_getter {
    ($field_name:ident, $field_type:ty, $end:expr, $start:expr) => {
        fn $field_name(data: u32) -> $field_type {
            extract_field(data, $end, $start).try_into().unwrap()
        }
    };
}

make_field_getter!(quadrant, u32, 1, 0);
make_field_getter!(opcode, u32, 6, 2);
make_field_getter!(rd, u8, 11, 7);
make_field_getter!(rs1, u8, 19, 15);
make_field_getter!(rs2, u8, 24, 20);
make_field_getter!(rs3, u8, 31, 27);
make_field_getter!(funct2, u32, 26, 25);
make_field_getter!(funct3, u32, 14, 12);
make_field_getter!(funct7, u32, 31, 25);
make_field_getter!(imm116, u32, 31, 26);

// Compressed-format fields. RP1/RP2 are the 3-bit register fields
// naming x8..x15; the +8 renumbering happens in the format readers.
make_field_getter!(copcode, u32, 15, 13);
make_field_getter!(cfunct1, u32, 12, 12);
make_field_getter!(cfunct2low, u32, 6, 5);
make_field_getter!(cfunct2high, u32, 11, 10);
make_field_getter!(rp1, u8, 9, 7);
make_field_getter!(rp2, u8, 4, 2);
make_field_getter!(rc1, u8, 11, 7);
make_field_getter!(rc2, u8, 6, 2);

fn utype_read(data: u32) -> Instr {
    Instr {
        imm: (data & 0xffff_f000) as i32,
        rd: rd(data),
        ..Instr::default()
    }
}

fn itype_read(data: u32) -> Instr {
    Instr {
        imm: (data as i32) >> 20,
        rs1: rs1(data),
        rd: rd(data),
        ..Instr::default()
    }
}

fn jtype_read(data: u32) -> Instr {
    let imm20 = extract_field(data, 31, 31);
    let imm10_1 = extract_field(data, 30, 21);
    let imm11 = extract_field(data, 20, 20);
    let imm19_12 = extract_field(data, 19, 12);

    let imm = (imm20 << 20) | (imm19_12 << 12) | (imm11 << 11) | (imm10_1 << 1);

    Instr {
        imm: sign_extend(imm, 21),
        rd: rd(data),
        ..Instr::default()
    }
}

fn btype_read(data: u32) -> Instr {
    let imm12 = extract_field(data, 31, 31);
    let imm10_5 = extract_field(data, 30, 25);
    let imm4_1 = extract_field(data, 11, 8);
    let imm11 = extract_field(data, 7, 7);

    let imm = (imm12 << 12) | (imm11 << 11) | (imm10_5 << 5) | (imm4_1 << 1);

    Instr {
        imm: sign_extend(imm, 13),
        rs1: rs1(data),
        rs2: rs2(data),
        ..Instr::default()
    }
}

fn rtype_read(data: u32) -> Instr {
    Instr {
        rs1: rs1(data),
        rs2: rs2(data),
        rd: rd(data),
        ..Instr::default()
    }
}

fn stype_read(data: u32) -> Instr {
    let imm11_5 = extract_field(data, 31, 25);
    let imm4_0 = extract_field(data, 11, 7);

    let imm = (imm11_5 << 5) | imm4_0;

    Instr {
        imm: sign_extend(imm, 12),
        rs1: rs1(data),
        rs2: rs2(data),
        ..Instr::default()
    }
}

fn csrtype_read(data: u32) -> Instr {
    Instr {
        csr: (data >> 20) as u16,
        rs1: rs1(data),
        rd: rd(data),
        ..Instr::default()
    }
}

fn fprtype_read(data: u32) -> Instr {
    Instr {
        rs1: rs1(data),
        rs2: rs2(data),
        rs3: rs3(data),
        rd: rd(data),
        ..Instr::default()
    }
}

/// CA format (C.SUB, C.XOR, ...): both registers are 3-bit fields
fn catype_read(data: u32) -> Instr {
    Instr {
        rd: rp1(data) + 8,
        rs2: rp2(data) + 8,
        rvc: true,
        ..Instr::default()
    }
}

/// CR format (C.JR, C.MV, C.ADD, ...): full 5-bit register fields
fn crtype_read(data: u32) -> Instr {
    Instr {
        rs1: rc1(data),
        rs2: rc2(data),
        rvc: true,
        ..Instr::default()
    }
}

/// CI format, 6-bit signed immediate (C.ADDI, C.LI, C.SLLI, ...)
fn citype_read(data: u32) -> Instr {
    let imm4_0 = extract_field(data, 6, 2);
    let imm5 = extract_field(data, 12, 12);

    let imm = (imm5 << 5) | imm4_0;

    Instr {
        imm: sign_extend(imm, 6),
        rd: rc1(data),
        rvc: true,
        ..Instr::default()
    }
}

/// CI format, doubleword stack load offset (C.LDSP, C.FLDSP)
fn citype_ldsp_read(data: u32) -> Instr {
    let imm8_6 = extract_field(data, 4, 2);
    let imm4_3 = extract_field(data, 6, 5);
    let imm5 = extract_field(data, 12, 12);

    let imm = (imm8_6 << 6) | (imm4_3 << 3) | (imm5 << 5);

    Instr {
        imm: imm as i32,
        rd: rc1(data),
        rvc: true,
        ..Instr::default()
    }
}

/// CI format, the C.ADDI16SP scrambling (10-bit signed, low bit 0)
fn citype_addi16sp_read(data: u32) -> Instr {
    let imm5 = extract_field(data, 2, 2);
    let imm8_7 = extract_field(data, 4, 3);
    let imm6 = extract_field(data, 5, 5);
    let imm4 = extract_field(data, 6, 6);
    let imm9 = extract_field(data, 12, 12);

    let imm =
        (imm9 << 9) | (imm8_7 << 7) | (imm6 << 6) | (imm5 << 5) | (imm4 << 4);

    Instr {
        imm: sign_extend(imm, 10),
        rd: rc1(data),
        rvc: true,
        ..Instr::default()
    }
}

/// CI format, word stack load offset (C.LWSP)
fn citype_lwsp_read(data: u32) -> Instr {
    let imm5 = extract_field(data, 12, 12);
    let imm4_2 = extract_field(data, 6, 4);
    let imm7_6 = extract_field(data, 3, 2);

    let imm = (imm7_6 << 6) | (imm5 << 5) | (imm4_2 << 2);

    Instr {
        imm: imm as i32,
        rd: rc1(data),
        rvc: true,
        ..Instr::default()
    }
}

/// CI format, the C.LUI scrambling (18-bit signed, low 12 bits 0)
fn citype_lui_read(data: u32) -> Instr {
    let imm16_12 = extract_field(data, 6, 2);
    let imm17 = extract_field(data, 12, 12);

    let imm = (imm17 << 17) | (imm16_12 << 12);

    Instr {
        imm: sign_extend(imm, 18),
        rd: rc1(data),
        rvc: true,
        ..Instr::default()
    }
}

/// CB format, conditional branch offset (9-bit signed, low bit 0)
fn cbtype_read(data: u32) -> Instr {
    let imm5 = extract_field(data, 2, 2);
    let imm2_1 = extract_field(data, 4, 3);
    let imm7_6 = extract_field(data, 6, 5);
    let imm4_3 = extract_field(data, 11, 10);
    let imm8 = extract_field(data, 12, 12);

    let imm =
        (imm8 << 8) | (imm7_6 << 6) | (imm5 << 5) | (imm4_3 << 3) | (imm2_1 << 1);

    Instr {
        imm: sign_extend(imm, 9),
        rs1: rp1(data) + 8,
        rvc: true,
        ..Instr::default()
    }
}

/// CB format, immediate-operand subset (C.SRLI, C.SRAI, C.ANDI)
fn cbtype_imm_read(data: u32) -> Instr {
    let imm4_0 = extract_field(data, 6, 2);
    let imm5 = extract_field(data, 12, 12);

    let imm = (imm5 << 5) | imm4_0;

    Instr {
        imm: sign_extend(imm, 6),
        rd: rp1(data) + 8,
        rvc: true,
        ..Instr::default()
    }
}

/// CS format, doubleword store offset (C.SD, C.FSD)
fn cstype_sd_read(data: u32) -> Instr {
    let imm7_6 = extract_field(data, 6, 5);
    let imm5_3 = extract_field(data, 12, 10);

    let imm = (imm7_6 << 6) | (imm5_3 << 3);

    Instr {
        imm: imm as i32,
        rs1: rp1(data) + 8,
        rs2: rp2(data) + 8,
        rvc: true,
        ..Instr::default()
    }
}

/// CS format, word store offset (C.SW)
fn cstype_sw_read(data: u32) -> Instr {
    let imm6 = extract_field(data, 5, 5);
    let imm2 = extract_field(data, 6, 6);
    let imm5_3 = extract_field(data, 12, 10);

    let imm = (imm6 << 6) | (imm5_3 << 3) | (imm2 << 2);

    Instr {
        imm: imm as i32,
        rs1: rp1(data) + 8,
        rs2: rp2(data) + 8,
        rvc: true,
        ..Instr::default()
    }
}

/// CJ format, jump offset (12-bit signed, low bit 0)
fn cjtype_read(data: u32) -> Instr {
    let imm5 = extract_field(data, 2, 2);
    let imm3_1 = extract_field(data, 5, 3);
    let imm7 = extract_field(data, 6, 6);
    let imm6 = extract_field(data, 7, 7);
    let imm10 = extract_field(data, 8, 8);
    let imm9_8 = extract_field(data, 10, 9);
    let imm4 = extract_field(data, 11, 11);
    let imm11 = extract_field(data, 12, 12);

    let imm = (imm11 << 11)
        | (imm10 << 10)
        | (imm9_8 << 8)
        | (imm7 << 7)
        | (imm6 << 6)
        | (imm5 << 5)
        | (imm4 << 4)
        | (imm3_1 << 1);

    Instr {
        imm: sign_extend(imm, 12),
        rvc: true,
        ..Instr::default()
    }
}

/// CL format, word load offset (C.LW)
fn cltype_lw_read(data: u32) -> Instr {
    let imm6 = extract_field(data, 5, 5);
    let imm2 = extract_field(data, 6, 6);
    let imm5_3 = extract_field(data, 12, 10);

    let imm = (imm6 << 6) | (imm5_3 << 3) | (imm2 << 2);

    Instr {
        imm: imm as i32,
        rs1: rp1(data) + 8,
        rd: rp2(data) + 8,
        rvc: true,
        ..Instr::default()
    }
}

/// CL format, doubleword load offset (C.LD, C.FLD)
fn cltype_ld_read(data: u32) -> Instr {
    let imm7_6 = extract_field(data, 6, 5);
    let imm5_3 = extract_field(data, 12, 10);

    let imm = (imm7_6 << 6) | (imm5_3 << 3);

    Instr {
        imm: imm as i32,
        rs1: rp1(data) + 8,
        rd: rp2(data) + 8,
        rvc: true,
        ..Instr::default()
    }
}

/// CSS format, doubleword stack store offset (C.SDSP, C.FSDSP)
fn csstype_sd_read(data: u32) -> Instr {
    let imm8_6 = extract_field(data, 9, 7);
    let imm5_3 = extract_field(data, 12, 10);

    let imm = (imm8_6 << 6) | (imm5_3 << 3);

    Instr {
        imm: imm as i32,
        rs2: rc2(data),
        rvc: true,
        ..Instr::default()
    }
}

/// CSS format, word stack store offset (C.SWSP)
fn csstype_sw_read(data: u32) -> Instr {
    let imm7_6 = extract_field(data, 8, 7);
    let imm5_2 = extract_field(data, 12, 9);

    let imm = (imm7_6 << 6) | (imm5_2 << 2);

    Instr {
        imm: imm as i32,
        rs2: rc2(data),
        rvc: true,
        ..Instr::default()
    }
}

/// CIW format (C.ADDI4SPN): zero-extended 10-bit immediate
fn ciwtype_read(data: u32) -> Instr {
    let imm3 = extract_field(data, 5, 5);
    let imm2 = extract_field(data, 6, 6);
    let imm9_6 = extract_field(data, 10, 7);
    let imm5_4 = extract_field(data, 12, 11);

    let imm = (imm9_6 << 6) | (imm5_4 << 4) | (imm3 << 3) | (imm2 << 2);

    Instr {
        imm: imm as i32,
        rd: rp2(data) + 8,
        rvc: true,
        ..Instr::default()
    }
}

/// Decode one instruction word
///
/// Pure and total over the supported subset: the same word always
/// yields the same record, and anything outside the subset is a
/// [`DecodeError`] carrying the offending word.
pub fn decode(data: u32) -> Result<Instr, DecodeError> {
    match quadrant(data) {
        0x0 => decode_quadrant0(data),
        0x1 => decode_quadrant1(data),
        0x2 => decode_quadrant2(data),
        _ => decode_quadrant3(data),
    }
}

fn decode_quadrant0(data: u32) -> Result<Instr, DecodeError> {
    match copcode(data) {
        0x0 => {
            // C.ADDI4SPN
            let mut inst = ciwtype_read(data);
            if inst.imm == 0 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            inst.rs1 = reg::SP;
            inst.kind = InstrType::Addi;
            Ok(inst)
        }
        0x1 => {
            // C.FLD
            let mut inst = cltype_ld_read(data);
            inst.kind = InstrType::Fld;
            Ok(inst)
        }
        0x2 => {
            // C.LW
            let mut inst = cltype_lw_read(data);
            inst.kind = InstrType::Lw;
            Ok(inst)
        }
        0x3 => {
            // C.LD
            let mut inst = cltype_ld_read(data);
            inst.kind = InstrType::Ld;
            Ok(inst)
        }
        0x5 => {
            // C.FSD
            let mut inst = cstype_sd_read(data);
            inst.kind = InstrType::Fsd;
            Ok(inst)
        }
        0x6 => {
            // C.SW
            let mut inst = cstype_sw_read(data);
            inst.kind = InstrType::Sw;
            Ok(inst)
        }
        0x7 => {
            // C.SD
            let mut inst = cstype_sd_read(data);
            inst.kind = InstrType::Sd;
            Ok(inst)
        }
        _ => Err(DecodeError::IllegalInstruction { data }),
    }
}

fn decode_quadrant1(data: u32) -> Result<Instr, DecodeError> {
    match copcode(data) {
        0x0 => {
            // C.ADDI (and C.NOP when rd is x0)
            let mut inst = citype_read(data);
            inst.rs1 = inst.rd;
            inst.kind = InstrType::Addi;
            Ok(inst)
        }
        0x1 => {
            // C.ADDIW
            let mut inst = citype_read(data);
            if inst.rd == 0 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            inst.rs1 = inst.rd;
            inst.kind = InstrType::Addiw;
            Ok(inst)
        }
        0x2 => {
            // C.LI
            let mut inst = citype_read(data);
            inst.rs1 = reg::ZERO;
            inst.kind = InstrType::Addi;
            Ok(inst)
        }
        0x3 => {
            if rc1(data) == reg::SP {
                // C.ADDI16SP
                let mut inst = citype_addi16sp_read(data);
                if inst.imm == 0 {
                    return Err(DecodeError::MalformedInstruction { data });
                }
                inst.rs1 = inst.rd;
                inst.kind = InstrType::Addi;
                Ok(inst)
            } else {
                // C.LUI
                let mut inst = citype_lui_read(data);
                if inst.imm == 0 {
                    return Err(DecodeError::MalformedInstruction { data });
                }
                inst.kind = InstrType::Lui;
                Ok(inst)
            }
        }
        0x4 => match cfunct2high(data) {
            0x0 | 0x1 | 0x2 => {
                // C.SRLI / C.SRAI / C.ANDI
                let mut inst = cbtype_imm_read(data);
                inst.rs1 = inst.rd;
                inst.kind = match cfunct2high(data) {
                    0x0 => InstrType::Srli,
                    0x1 => InstrType::Srai,
                    _ => InstrType::Andi,
                };
                Ok(inst)
            }
            _ => {
                let mut inst = catype_read(data);
                inst.rs1 = inst.rd;
                match cfunct1(data) {
                    0x0 => {
                        inst.kind = match cfunct2low(data) {
                            0x0 => InstrType::Sub,
                            0x1 => InstrType::Xor,
                            0x2 => InstrType::Or,
                            _ => InstrType::And,
                        };
                        Ok(inst)
                    }
                    _ => {
                        // C.SUBW / C.ADDW
                        inst.kind = match cfunct2low(data) {
                            0x0 => InstrType::Subw,
                            0x1 => InstrType::Addw,
                            _ => {
                                return Err(DecodeError::IllegalInstruction {
                                    data,
                                })
                            }
                        };
                        Ok(inst)
                    }
                }
            }
        },
        0x5 => {
            // C.J
            let mut inst = cjtype_read(data);
            inst.rd = reg::ZERO;
            inst.kind = InstrType::Jal;
            inst.cont = true;
            Ok(inst)
        }
        0x6 | 0x7 => {
            // C.BEQZ / C.BNEZ
            let mut inst = cbtype_read(data);
            inst.rs2 = reg::ZERO;
            inst.kind = if copcode(data) == 0x6 {
                InstrType::Beq
            } else {
                InstrType::Bne
            };
            Ok(inst)
        }
        _ => Err(DecodeError::IllegalInstruction { data }),
    }
}

fn decode_quadrant2(data: u32) -> Result<Instr, DecodeError> {
    match copcode(data) {
        0x0 => {
            // C.SLLI
            let mut inst = citype_read(data);
            inst.rs1 = inst.rd;
            inst.kind = InstrType::Slli;
            Ok(inst)
        }
        0x1 => {
            // C.FLDSP
            let mut inst = citype_ldsp_read(data);
            inst.rs1 = reg::SP;
            inst.kind = InstrType::Fld;
            Ok(inst)
        }
        0x2 => {
            // C.LWSP
            let mut inst = citype_lwsp_read(data);
            if inst.rd == 0 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            inst.rs1 = reg::SP;
            inst.kind = InstrType::Lw;
            Ok(inst)
        }
        0x3 => {
            // C.LDSP
            let mut inst = citype_ldsp_read(data);
            if inst.rd == 0 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            inst.rs1 = reg::SP;
            inst.kind = InstrType::Ld;
            Ok(inst)
        }
        0x4 => {
            let mut inst = crtype_read(data);
            match cfunct1(data) {
                0x0 => {
                    if inst.rs2 == 0 {
                        // C.JR
                        if inst.rs1 == 0 {
                            return Err(DecodeError::MalformedInstruction {
                                data,
                            });
                        }
                        inst.rd = reg::ZERO;
                        inst.kind = InstrType::Jalr;
                        inst.cont = true;
                    } else {
                        // C.MV
                        inst.rd = inst.rs1;
                        inst.rs1 = reg::ZERO;
                        inst.kind = InstrType::Add;
                    }
                    Ok(inst)
                }
                _ => {
                    if inst.rs1 == 0 && inst.rs2 == 0 {
                        // C.EBREAK
                        inst.kind = InstrType::Ebreak;
                        inst.cont = true;
                    } else if inst.rs2 == 0 {
                        // C.JALR
                        inst.rd = reg::RA;
                        inst.kind = InstrType::Jalr;
                        inst.cont = true;
                    } else {
                        // C.ADD
                        inst.rd = inst.rs1;
                        inst.kind = InstrType::Add;
                    }
                    Ok(inst)
                }
            }
        }
        0x5 => {
            // C.FSDSP
            let mut inst = csstype_sd_read(data);
            inst.rs1 = reg::SP;
            inst.kind = InstrType::Fsd;
            Ok(inst)
        }
        0x6 => {
            // C.SWSP
            let mut inst = csstype_sw_read(data);
            inst.rs1 = reg::SP;
            inst.kind = InstrType::Sw;
            Ok(inst)
        }
        0x7 => {
            // C.SDSP
            let mut inst = csstype_sd_read(data);
            inst.rs1 = reg::SP;
            inst.kind = InstrType::Sd;
            Ok(inst)
        }
        _ => Err(DecodeError::IllegalInstruction { data }),
    }
}

fn decode_quadrant3(data: u32) -> Result<Instr, DecodeError> {
    match opcode(data) {
        0x00 => {
            let mut inst = itype_read(data);
            inst.kind = match funct3(data) {
                0x0 => InstrType::Lb,
                0x1 => InstrType::Lh,
                0x2 => InstrType::Lw,
                0x3 => InstrType::Ld,
                0x4 => InstrType::Lbu,
                0x5 => InstrType::Lhu,
                0x6 => InstrType::Lwu,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x01 => {
            let mut inst = itype_read(data);
            inst.kind = match funct3(data) {
                0x2 => InstrType::Flw,
                0x3 => InstrType::Fld,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x03 => {
            let mut inst = Instr::default();
            inst.kind = match funct3(data) {
                0x0 => InstrType::Fence,
                0x1 => InstrType::FenceI,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x04 => {
            let mut inst = itype_read(data);
            inst.kind = match funct3(data) {
                0x0 => InstrType::Addi,
                0x1 => {
                    if imm116(data) == 0 {
                        InstrType::Slli
                    } else {
                        return Err(DecodeError::IllegalInstruction { data });
                    }
                }
                0x2 => InstrType::Slti,
                0x3 => InstrType::Sltiu,
                0x4 => InstrType::Xori,
                0x5 => match imm116(data) {
                    0x00 => InstrType::Srli,
                    0x10 => InstrType::Srai,
                    _ => return Err(DecodeError::IllegalInstruction { data }),
                },
                0x6 => InstrType::Ori,
                _ => InstrType::Andi,
            };
            Ok(inst)
        }
        0x05 => {
            // AUIPC
            let mut inst = utype_read(data);
            inst.kind = InstrType::Auipc;
            Ok(inst)
        }
        0x06 => {
            let mut inst = itype_read(data);
            inst.kind = match funct3(data) {
                0x0 => InstrType::Addiw,
                0x1 => {
                    if funct7(data) == 0 {
                        InstrType::Slliw
                    } else {
                        return Err(DecodeError::IllegalInstruction { data });
                    }
                }
                0x5 => match funct7(data) {
                    0x00 => InstrType::Srliw,
                    0x20 => InstrType::Sraiw,
                    _ => return Err(DecodeError::IllegalInstruction { data }),
                },
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x08 => {
            let mut inst = stype_read(data);
            inst.kind = match funct3(data) {
                0x0 => InstrType::Sb,
                0x1 => InstrType::Sh,
                0x2 => InstrType::Sw,
                0x3 => InstrType::Sd,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x09 => {
            let mut inst = stype_read(data);
            inst.kind = match funct3(data) {
                0x2 => InstrType::Fsw,
                0x3 => InstrType::Fsd,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x0c => {
            let mut inst = rtype_read(data);
            inst.kind = match funct7(data) {
                0x00 => match funct3(data) {
                    0x0 => InstrType::Add,
                    0x1 => InstrType::Sll,
                    0x2 => InstrType::Slt,
                    0x3 => InstrType::Sltu,
                    0x4 => InstrType::Xor,
                    0x5 => InstrType::Srl,
                    0x6 => InstrType::Or,
                    _ => InstrType::And,
                },
                0x01 => match funct3(data) {
                    0x0 => InstrType::Mul,
                    0x1 => InstrType::Mulh,
                    0x2 => InstrType::Mulhsu,
                    0x3 => InstrType::Mulhu,
                    0x4 => InstrType::Div,
                    0x5 => InstrType::Divu,
                    0x6 => InstrType::Rem,
                    _ => InstrType::Remu,
                },
                0x20 => match funct3(data) {
                    0x0 => InstrType::Sub,
                    0x5 => InstrType::Sra,
                    _ => return Err(DecodeError::IllegalInstruction { data }),
                },
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x0d => {
            // LUI
            let mut inst = utype_read(data);
            inst.kind = InstrType::Lui;
            Ok(inst)
        }
        0x0e => {
            let mut inst = rtype_read(data);
            inst.kind = match funct7(data) {
                0x00 => match funct3(data) {
                    0x0 => InstrType::Addw,
                    0x1 => InstrType::Sllw,
                    0x5 => InstrType::Srlw,
                    _ => return Err(DecodeError::IllegalInstruction { data }),
                },
                0x01 => match funct3(data) {
                    0x0 => InstrType::Mulw,
                    0x4 => InstrType::Divw,
                    0x5 => InstrType::Divuw,
                    0x6 => InstrType::Remw,
                    0x7 => InstrType::Remuw,
                    _ => return Err(DecodeError::IllegalInstruction { data }),
                },
                0x20 => match funct3(data) {
                    0x0 => InstrType::Subw,
                    0x5 => InstrType::Sraw,
                    _ => return Err(DecodeError::IllegalInstruction { data }),
                },
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x10 => {
            // FMADD.S / FMADD.D
            let mut inst = fprtype_read(data);
            inst.kind = match funct2(data) {
                0x0 => InstrType::FmaddS,
                0x1 => InstrType::FmaddD,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x11 => {
            let mut inst = fprtype_read(data);
            inst.kind = match funct2(data) {
                0x0 => InstrType::FmsubS,
                0x1 => InstrType::FmsubD,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x12 => {
            let mut inst = fprtype_read(data);
            inst.kind = match funct2(data) {
                0x0 => InstrType::FnmsubS,
                0x1 => InstrType::FnmsubD,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x13 => {
            let mut inst = fprtype_read(data);
            inst.kind = match funct2(data) {
                0x0 => InstrType::FnmaddS,
                0x1 => InstrType::FnmaddD,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x14 => decode_op_fp(data),
        0x18 => {
            let mut inst = btype_read(data);
            inst.kind = match funct3(data) {
                0x0 => InstrType::Beq,
                0x1 => InstrType::Bne,
                0x4 => InstrType::Blt,
                0x5 => InstrType::Bge,
                0x6 => InstrType::Bltu,
                0x7 => InstrType::Bgeu,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        0x19 => {
            // JALR
            let mut inst = itype_read(data);
            inst.kind = InstrType::Jalr;
            inst.cont = true;
            Ok(inst)
        }
        0x1b => {
            // JAL
            let mut inst = jtype_read(data);
            inst.kind = InstrType::Jal;
            inst.cont = true;
            Ok(inst)
        }
        0x1c => {
            if data == 0x0000_0073 {
                // ECALL
                return Ok(Instr {
                    kind: InstrType::Ecall,
                    cont: true,
                    ..Instr::default()
                });
            }
            if data == 0x0010_0073 {
                // EBREAK
                return Ok(Instr {
                    kind: InstrType::Ebreak,
                    cont: true,
                    ..Instr::default()
                });
            }

            let mut inst = csrtype_read(data);
            inst.kind = match funct3(data) {
                0x1 => InstrType::Csrrw,
                0x2 => InstrType::Csrrs,
                0x3 => InstrType::Csrrc,
                0x5 => InstrType::Csrrwi,
                0x6 => InstrType::Csrrsi,
                0x7 => InstrType::Csrrci,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            };
            Ok(inst)
        }
        _ => Err(DecodeError::IllegalInstruction { data }),
    }
}

/// Decode the OP-FP family, which overloads funct7 heavily: plain
/// funct7 selects arithmetic, funct3 disambiguates sign-injection,
/// min/max and comparisons, and the rs2 field acts as a selector for
/// the conversion group.
fn decode_op_fp(data: u32) -> Result<Instr, DecodeError> {
    let mut inst = rtype_read(data);
    inst.kind = match funct7(data) {
        0x00 => InstrType::FaddS,
        0x01 => InstrType::FaddD,
        0x04 => InstrType::FsubS,
        0x05 => InstrType::FsubD,
        0x08 => InstrType::FmulS,
        0x09 => InstrType::FmulD,
        0x0c => InstrType::FdivS,
        0x0d => InstrType::FdivD,
        0x10 => match funct3(data) {
            0x0 => InstrType::FsgnjS,
            0x1 => InstrType::FsgnjnS,
            0x2 => InstrType::FsgnjxS,
            _ => return Err(DecodeError::IllegalInstruction { data }),
        },
        0x11 => match funct3(data) {
            0x0 => InstrType::FsgnjD,
            0x1 => InstrType::FsgnjnD,
            0x2 => InstrType::FsgnjxD,
            _ => return Err(DecodeError::IllegalInstruction { data }),
        },
        0x14 => match funct3(data) {
            0x0 => InstrType::FminS,
            0x1 => InstrType::FmaxS,
            _ => return Err(DecodeError::IllegalInstruction { data }),
        },
        0x15 => match funct3(data) {
            0x0 => InstrType::FminD,
            0x1 => InstrType::FmaxD,
            _ => return Err(DecodeError::IllegalInstruction { data }),
        },
        0x20 => {
            // FCVT.S.D encodes the source format in rs2
            if inst.rs2 != 1 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            InstrType::FcvtSD
        }
        0x21 => {
            if inst.rs2 != 0 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            InstrType::FcvtDS
        }
        0x2c => {
            if inst.rs2 != 0 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            InstrType::FsqrtS
        }
        0x2d => {
            if inst.rs2 != 0 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            InstrType::FsqrtD
        }
        0x50 => match funct3(data) {
            0x0 => InstrType::FleS,
            0x1 => InstrType::FltS,
            0x2 => InstrType::FeqS,
            _ => return Err(DecodeError::IllegalInstruction { data }),
        },
        0x51 => match funct3(data) {
            0x0 => InstrType::FleD,
            0x1 => InstrType::FltD,
            0x2 => InstrType::FeqD,
            _ => return Err(DecodeError::IllegalInstruction { data }),
        },
        0x60 => match inst.rs2 {
            0x0 => InstrType::FcvtWS,
            0x1 => InstrType::FcvtWuS,
            0x2 => InstrType::FcvtLS,
            0x3 => InstrType::FcvtLuS,
            _ => return Err(DecodeError::IllegalInstruction { data }),
        },
        0x61 => match inst.rs2 {
            0x0 => InstrType::FcvtWD,
            0x1 => InstrType::FcvtWuD,
            0x2 => InstrType::FcvtLD,
            0x3 => InstrType::FcvtLuD,
            _ => return Err(DecodeError::IllegalInstruction { data }),
        },
        0x68 => match inst.rs2 {
            0x0 => InstrType::FcvtSW,
            0x1 => InstrType::FcvtSWu,
            0x2 => InstrType::FcvtSL,
            0x3 => InstrType::FcvtSLu,
            _ => return Err(DecodeError::IllegalInstruction { data }),
        },
        0x69 => match inst.rs2 {
            0x0 => InstrType::FcvtDW,
            0x1 => InstrType::FcvtDWu,
            0x2 => InstrType::FcvtDL,
            0x3 => InstrType::FcvtDLu,
            _ => return Err(DecodeError::IllegalInstruction { data }),
        },
        0x70 => {
            if inst.rs2 != 0 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            match funct3(data) {
                0x0 => InstrType::FmvXW,
                0x1 => InstrType::FclassS,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            }
        }
        0x71 => {
            if inst.rs2 != 0 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            match funct3(data) {
                0x0 => InstrType::FmvXD,
                0x1 => InstrType::FclassD,
                _ => return Err(DecodeError::IllegalInstruction { data }),
            }
        }
        0x78 => {
            if inst.rs2 != 0 || funct3(data) != 0 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            InstrType::FmvWX
        }
        0x79 => {
            if inst.rs2 != 0 || funct3(data) != 0 {
                return Err(DecodeError::MalformedInstruction { data });
            }
            InstrType::FmvDX
        }
        _ => return Err(DecodeError::IllegalInstruction { data }),
    };
    Ok(inst)
}
