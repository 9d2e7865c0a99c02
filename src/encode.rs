//! Instruction word assembly
//!
//! Builders for the 32-bit encodings of the full-width formats, used
//! by the decoder and interpreter tests so fixtures can be written in
//! terms of fields rather than hand-computed hex. Register operands
//! are plain numbers (the x5 in `addi x5, x5, 1` is a 5).

/// Make a bit-mask of n bits using mask!(n)
macro_rules! mask {
    ($n:expr) => {
        (1u32 << $n) - 1
    };
}
pub(crate) use mask;

/// Mask a value to m least significant bits and
/// shift it left by s bits
macro_rules! mask_and_shift {
    ($val:expr, $m:expr, $s:expr) => {
        (mask!($m) & (($val as i64) as u32)) << $s
    };
}
pub(crate) use mask_and_shift;

/// Make an I-type instruction
macro_rules! itype {
    ($imm:expr, $rs1:expr, $funct3:expr, $rd:expr, $opcode:expr) => {
        mask_and_shift!($imm, 12, 20)
            | mask_and_shift!($rs1, 5, 15)
            | mask_and_shift!($funct3, 3, 12)
            | mask_and_shift!($rd, 5, 7)
            | mask_and_shift!($opcode, 7, 0)
    };
}
pub(crate) use itype;

/// Make an R- or S-type instruction. These instructions have the
/// same number of fields of the same size. The meaning of a and b is:
///
/// R-type: a = funct7, b = rd
/// S-type: a = imm[11:5], b = imm[4:0]
macro_rules! rstype {
    ($a:expr, $rs2:expr, $rs1:expr, $funct3:expr, $b:expr, $opcode:expr) => {
        mask_and_shift!($a, 7, 25)
            | mask_and_shift!($rs2, 5, 20)
            | mask_and_shift!($rs1, 5, 15)
            | mask_and_shift!($funct3, 3, 12)
            | mask_and_shift!($b, 5, 7)
            | mask_and_shift!($opcode, 7, 0)
    };
}
pub(crate) use rstype;

/// Make a U- or J-type instruction (if you are making a J-type
/// instruction, construct the immediate field with jtype_imm_field)
macro_rules! ujtype {
    ($imm:expr, $rd:expr, $opcode:expr) => {
        mask_and_shift!($imm, 20, 12)
            | mask_and_shift!($rd, 5, 7)
            | mask_and_shift!($opcode, 7, 0)
    };
}
pub(crate) use ujtype;

/// Make an R4-type (fused multiply-add) instruction
macro_rules! r4type {
    ($rs3:expr, $funct2:expr, $rs2:expr, $rs1:expr, $funct3:expr, $rd:expr, $opcode:expr) => {
        mask_and_shift!($rs3, 5, 27)
            | mask_and_shift!($funct2, 2, 25)
            | mask_and_shift!($rs2, 5, 20)
            | mask_and_shift!($rs1, 5, 15)
            | mask_and_shift!($funct3, 3, 12)
            | mask_and_shift!($rd, 5, 7)
            | mask_and_shift!($opcode, 7, 0)
    };
}
pub(crate) use r4type;

/// Takes a jump offset and shuffles it into the format required for
/// the 20-bit field of the U-type instruction (making it J-type)
macro_rules! jtype_imm_field {
    ($imm:expr) => {{
        let imm = (($imm as i64) as u32);
        let imm20 = (imm >> 20) & 0x1;
        let imm19_12 = (imm >> 12) & 0xff;
        let imm11 = (imm >> 11) & 0x1;
        let imm10_1 = (imm >> 1) & 0x3ff;
        (imm20 << 19) | (imm10_1 << 9) | (imm11 << 8) | imm19_12
    }};
}
pub(crate) use jtype_imm_field;

/// Returns (a, b) suitable for use with rstype for the conditional
/// branch instructions (making it B-type)
macro_rules! btype_imm_fields {
    ($imm:expr) => {{
        let imm = (($imm as i64) as u32);
        let imm12 = (imm >> 12) & 0x1;
        let imm11 = (imm >> 11) & 0x1;
        let imm10_5 = (imm >> 5) & 0x3f;
        let imm4_1 = (imm >> 1) & 0xf;
        ((imm12 << 6) | imm10_5, (imm4_1 << 1) | imm11)
    }};
}
pub(crate) use btype_imm_fields;

#[cfg(test)]
mod tests {

    #[test]
    fn check_canonical_nop() {
        // addi x0, x0, 0
        assert_eq!(itype!(0, 0, 0b000, 0, 0b0010011), 0x0000_0013);
    }

    #[test]
    fn check_rtype_add() {
        // add x10, x11, x12
        assert_eq!(rstype!(0, 12, 11, 0b000, 10, 0b0110011), 0x00c5_8533);
    }

    #[test]
    fn check_itype_negative_immediate() {
        // addi sp, sp, -32
        assert_eq!(itype!(-32, 2, 0b000, 2, 0b0010011), 0xfe01_0113);
    }

    #[test]
    fn check_jalr_ret() {
        // jalr x0, x1, 0
        assert_eq!(itype!(0, 1, 0b000, 0, 0b1100111), 0x0000_8067);
    }

    #[test]
    fn check_jtype_field_round_trip() {
        // jal x1, -4: imm field encodes offset -4
        let word = ujtype!(jtype_imm_field!(-4), 1, 0b1101111);
        assert_eq!(word, 0xffdf_f0ef);
    }

    #[test]
    fn check_btype_fields() {
        // beq x1, x2, 16
        let (a, b) = btype_imm_fields!(16);
        assert_eq!(rstype!(a, 2, 1, 0b000, b, 0b1100011), 0x0020_8863);
    }
}
