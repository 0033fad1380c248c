use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    if env::var_os("PROTOC").is_none() {
        unsafe {
            env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
        }
    }

    // The service has an rpc named Connect; the generated transport
    // constructor would collide with it, so clients are built from an
    // explicit Endpoint + `new` instead.
    tonic_prost_build::configure()
        .build_transport(false)
        .file_descriptor_set_path(out_dir.join("chat_descriptor.bin"))
        .compile_protos(&["proto/chat.proto"], &["proto"])?;

    Ok(())
}
