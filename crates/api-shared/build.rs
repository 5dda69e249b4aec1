//! Build script for the `api-shared` crate.
//!
//! ## Purpose
//! Generates Rust protobuf types from the billing RPC contract and the patient event schema, and
//! emits a file-descriptor set.
//!
//! ## Intended use
//! The billing client and server stubs are used by `patient-core` (client) and `billing-stub`
//! (server). The descriptor set is used for gRPC reflection.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let proto_include_root = std::path::Path::new(manifest_dir).join("proto");
    let proto_files = [
        proto_include_root.join("billing_service.proto"),
        proto_include_root.join("patient_event.proto"),
    ];

    for proto_file in &proto_files {
        println!("cargo:rerun-if-changed={}", proto_file.display());
    }
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(
            std::path::Path::new(&std::env::var("OUT_DIR")?).join("proto_descriptor.bin"),
        )
        .compile_protos(&proto_files, &[proto_include_root.as_path()])?;

    Ok(())
}
