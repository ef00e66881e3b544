fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_path = std::env::var("PROTO_PATH").unwrap_or_else(|_| "proto".to_string());
    let proto_file = format!("{}/wsgateway.proto", proto_path);

    // Use a vendored protoc binary when one isn't provided by the environment,
    // so the build doesn't depend on a system-installed protobuf-compiler.
    if std::env::var_os("PROTOC").is_none() {
        if let Ok(protoc) = protoc_bin_vendored::protoc_bin_path() {
            std::env::set_var("PROTOC", protoc);
        }
    }

    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile(&[&proto_file], &[&proto_path])?;

    println!("cargo:rerun-if-changed={}", proto_file);
    Ok(())
}
