use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    audio: Audio,
    network: Network,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Audio {
    capture_device: String,
    input_sample_rate: u32,
    output_sample_rate: u32,
    quantum_size: usize,
    flush_quanta: usize,
    max_frame_bytes: usize,
    relay_capacity: usize,
}

#[derive(Deserialize)]
struct Network {
    ws_url: String,
    #[serde(default)]
    connect_timeout_ms: u64,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 音频配置
    println!("cargo:rustc-env=CAPTURE_DEVICE={}", config.audio.capture_device);
    println!("cargo:rustc-env=INPUT_SAMPLE_RATE={}", config.audio.input_sample_rate);
    println!("cargo:rustc-env=OUTPUT_SAMPLE_RATE={}", config.audio.output_sample_rate);
    println!("cargo:rustc-env=QUANTUM_SIZE={}", config.audio.quantum_size);
    println!("cargo:rustc-env=FLUSH_QUANTA={}", config.audio.flush_quanta);
    println!("cargo:rustc-env=MAX_FRAME_BYTES={}", config.audio.max_frame_bytes);
    println!("cargo:rustc-env=RELAY_CAPACITY={}", config.audio.relay_capacity);

    // 网络配置
    println!("cargo:rustc-env=WS_URL={}", config.network.ws_url);
    println!("cargo:rustc-env=CONNECT_TIMEOUT_MS={}", config.network.connect_timeout_ms);
}
