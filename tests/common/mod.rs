//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;
use vk_repro::device::{Accelerator, Platform};

/// Encode one SPIR-V instruction.
fn op(opcode: u32, operands: &[u32]) -> Vec<u32> {
    let mut words = vec![((operands.len() as u32 + 1) << 16) | opcode];
    words.extend_from_slice(operands);
    words
}

/// SPIR-V 1.0 compute kernel, local size 20x1x1, entry point `main`:
/// `out[gl_LocalInvocationID.x] = in1[gl_LocalInvocationID.x]`
/// with `in1` at binding 0 and `out` at binding 2 of set 0.
pub fn identity_kernel_words() -> Vec<u32> {
    // Result ids.
    const MAIN: u32 = 1;
    const LOCAL_ID: u32 = 2;
    const RUNTIME_ARR: u32 = 3;
    const BUF: u32 = 4;
    const IN1: u32 = 5;
    const OUT: u32 = 6;
    const VOID: u32 = 7;
    const FN_VOID: u32 = 8;
    const UINT: u32 = 9;
    const UVEC3: u32 = 10;
    const PTR_IN_UVEC3: u32 = 11;
    const PTR_IN_UINT: u32 = 12;
    const UINT_0: u32 = 13;
    const INT: u32 = 14;
    const INT_0: u32 = 15;
    const FLOAT: u32 = 16;
    const PTR_UNIFORM_BUF: u32 = 17;
    const PTR_UNIFORM_FLOAT: u32 = 18;
    const LABEL: u32 = 19;
    const IDX_PTR: u32 = 20;
    const IDX: u32 = 21;
    const SRC: u32 = 22;
    const VAL: u32 = 23;
    const DST: u32 = 24;
    const BOUND: u32 = 25;

    // Storage classes.
    const INPUT: u32 = 1;
    const UNIFORM: u32 = 2;

    let main_name = u32::from_le_bytes(*b"main");

    let mut words = vec![0x0723_0203, 0x0001_0000, 0, BOUND, 0];
    let instructions = [
        op(17, &[1]),                                     // OpCapability Shader
        op(14, &[0, 1]),                                  // OpMemoryModel Logical GLSL450
        op(15, &[5, MAIN, main_name, 0, LOCAL_ID]),       // OpEntryPoint GLCompute
        op(16, &[MAIN, 17, 20, 1, 1]),                    // OpExecutionMode LocalSize 20 1 1
        op(71, &[LOCAL_ID, 11, 27]),                      // BuiltIn LocalInvocationId
        op(71, &[RUNTIME_ARR, 6, 4]),                     // ArrayStride 4
        op(72, &[BUF, 0, 35, 0]),                         // member 0 Offset 0
        op(71, &[BUF, 3]),                                // BufferBlock
        op(71, &[IN1, 34, 0]),                            // DescriptorSet 0
        op(71, &[IN1, 33, 0]),                            // Binding 0
        op(71, &[OUT, 34, 0]),                            // DescriptorSet 0
        op(71, &[OUT, 33, 2]),                            // Binding 2
        op(19, &[VOID]),                                  // OpTypeVoid
        op(33, &[FN_VOID, VOID]),                         // OpTypeFunction
        op(21, &[UINT, 32, 0]),                           // OpTypeInt 32 unsigned
        op(23, &[UVEC3, UINT, 3]),                        // OpTypeVector
        op(32, &[PTR_IN_UVEC3, INPUT, UVEC3]),            // OpTypePointer
        op(59, &[PTR_IN_UVEC3, LOCAL_ID, INPUT]),         // OpVariable
        op(32, &[PTR_IN_UINT, INPUT, UINT]),              // OpTypePointer
        op(43, &[UINT, UINT_0, 0]),                       // OpConstant
        op(21, &[INT, 32, 1]),                            // OpTypeInt 32 signed
        op(43, &[INT, INT_0, 0]),                         // OpConstant
        op(22, &[FLOAT, 32]),                             // OpTypeFloat
        op(29, &[RUNTIME_ARR, FLOAT]),                    // OpTypeRuntimeArray
        op(30, &[BUF, RUNTIME_ARR]),                      // OpTypeStruct
        op(32, &[PTR_UNIFORM_BUF, UNIFORM, BUF]),         // OpTypePointer
        op(59, &[PTR_UNIFORM_BUF, IN1, UNIFORM]),         // OpVariable
        op(59, &[PTR_UNIFORM_BUF, OUT, UNIFORM]),         // OpVariable
        op(32, &[PTR_UNIFORM_FLOAT, UNIFORM, FLOAT]),     // OpTypePointer
        op(54, &[VOID, MAIN, 0, FN_VOID]),                // OpFunction
        op(248, &[LABEL]),                                // OpLabel
        op(65, &[PTR_IN_UINT, IDX_PTR, LOCAL_ID, UINT_0]), // OpAccessChain
        op(61, &[UINT, IDX, IDX_PTR]),                    // OpLoad
        op(65, &[PTR_UNIFORM_FLOAT, SRC, IN1, INT_0, IDX]), // OpAccessChain
        op(61, &[FLOAT, VAL, SRC]),                       // OpLoad
        op(65, &[PTR_UNIFORM_FLOAT, DST, OUT, INT_0, IDX]), // OpAccessChain
        op(62, &[DST, VAL]),                              // OpStore
        op(253, &[]),                                     // OpReturn
        op(56, &[]),                                      // OpFunctionEnd
    ];
    for instruction in instructions {
        words.extend(instruction);
    }
    words
}

pub fn identity_kernel_bytes() -> Vec<u8> {
    identity_kernel_words()
        .iter()
        .flat_map(|w| w.to_ne_bytes())
        .collect()
}

/// Write `bytes` to a kernel file in a fresh temp dir.
pub fn write_kernel(bytes: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("kernel.spv");
    std::fs::write(&path, bytes).expect("write kernel");
    (dir, path)
}

/// A Vulkan instance and its accelerators. Panics when the machine has no
/// loader or no devices; tests calling this are `#[ignore]`d and run with
/// `cargo test -- --ignored`.
pub fn vulkan() -> (Platform, Vec<Accelerator>) {
    let platform = Platform::new().unwrap_or_else(|e| panic!("Vulkan unavailable: {e}"));
    let accelerators = platform
        .accelerators()
        .unwrap_or_else(|e| panic!("enumerating accelerators: {e}"));
    assert!(!accelerators.is_empty(), "no Vulkan accelerators");
    (platform, accelerators)
}
