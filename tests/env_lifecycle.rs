#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use ropod_gym::clients::{ServiceClient, VelocityCommand, VelocityPublisher};
use ropod_gym::error::ConfigError;
use ropod_gym::{CommandSpec, Config, EnvError, EnvResult, GymEnv, RenderMode, RopodEnv, RopodNavDiscreteEnv};
use tokio_test::{assert_err, assert_ok};

/// 内存中的服务，记录调用次数
///
/// 等待服务时先确认 `ready_files` 都已生成（对应进程已启动），
/// `fail_wait` 为 true 时随后返回错误
#[derive(Default)]
struct MockServiceClient {
    waits: AtomicUsize,
    calls: AtomicUsize,
    ready_files: Vec<PathBuf>,
    fail_wait: bool,
}

impl MockServiceClient {
    fn waiting_for(ready_files: Vec<PathBuf>) -> Self {
        Self {
            ready_files,
            ..Self::default()
        }
    }
}

impl ServiceClient for MockServiceClient {
    fn wait_for_service<'a>(&'a self, _service: &'a str) -> BoxFuture<'a, EnvResult<()>> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            for path in &self.ready_files {
                wait_for_file(path).await;
            }
            if self.fail_wait {
                return Err(EnvError::Other("服务不可用".to_string()));
            }
            Ok(())
        })
    }

    fn call_empty<'a>(&'a self, _service: &'a str) -> BoxFuture<'a, EnvResult<()>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

/// 记录发布的速度指令
#[derive(Clone, Default)]
struct RecordingPublisher {
    published: Arc<Mutex<Vec<VelocityCommand>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl VelocityPublisher for RecordingPublisher {
    fn publish<'a>(&'a mut self, command: VelocityCommand) -> BoxFuture<'a, EnvResult<()>> {
        self.published.lock().unwrap().push(command);
        Box::pin(async { Ok(()) })
    }

    fn shutdown<'a>(&'a mut self) -> BoxFuture<'a, EnvResult<()>> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

fn scratch_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ropod_gym_{}_{}", test_name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// 代替 ROS 程序的常驻进程
fn sleeper(name: &str) -> CommandSpec {
    CommandSpec::new("sh").with_args(["-c", "exec sleep 30", name])
}

/// 把启动时刻写入 `<out>.stamp`、收到的参数写入 `out` 后常驻
fn recorder(name: &str, out: &Path) -> CommandSpec {
    let script = format!(
        "date +%s%N > '{}.stamp'; echo \"$@\" > '{}'; exec sleep 30",
        out.display(),
        out.display()
    );
    CommandSpec::new("sh").with_args(["-c".to_string(), script, name.to_string()])
}

/// 收到 SIGTERM 时写 `terminated` 标记后退出；信号处理装好后写 `ready`
fn term_recorder(name: &str, ready: &Path, terminated: &Path) -> CommandSpec {
    let script = format!(
        "trap \"echo term > '{}'; exit 0\" TERM; echo ready > '{}'; while :; do sleep 0.1; done",
        terminated.display(),
        ready.display()
    );
    CommandSpec::new("sh").with_args(["-c".to_string(), script, name.to_string()])
}

fn read_stamp(out: &Path) -> u128 {
    let path = PathBuf::from(format!("{}.stamp", out.display()));
    std::fs::read_to_string(&path)
        .unwrap()
        .trim()
        .parse()
        .unwrap()
}

fn test_config() -> Config {
    let mut config = Config::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml"));
    config.roscore_startup_delay_ms = 0;
    config.roscore_command = sleeper("roscore");
    config.roslaunch_command = sleeper("roslaunch");
    config.gzclient_command = sleeper("gzclient");
    config
}

async fn launch(config: Config) -> (RopodEnv, Arc<MockServiceClient>) {
    let client = Arc::new(MockServiceClient::default());
    let env = RopodEnv::launch_with_client(config, client.clone())
        .await
        .expect("环境启动失败");
    (env, client)
}

async fn wait_for_file(path: &Path) -> String {
    for _ in 0..100 {
        if let Ok(content) = std::fs::read_to_string(path) {
            if !content.is_empty() {
                return content;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("{} 未生成", path.display());
}

#[tokio::test]
async fn missing_launch_file_fails_before_spawning() {
    let dir = scratch_dir("missing_launch");
    let marker = dir.join("spawned");
    let mut config = test_config();
    config.launch_file_path = dir.join("does_not_exist.launch");
    config.roscore_command = CommandSpec::new("sh").with_args([
        "-c".to_string(),
        format!("touch '{}'", marker.display()),
    ]);
    let client = Arc::new(MockServiceClient::default());

    let err = RopodEnv::launch_with_client(config, client.clone())
        .await
        .err()
        .expect("应返回配置错误");

    assert!(matches!(
        err,
        EnvError::Config(ConfigError::LaunchFileNotFound { .. })
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!marker.exists());
    assert_eq!(client.waits.load(Ordering::SeqCst), 0);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn launch_passes_port_and_headless_flag() {
    let dir = scratch_dir("launch_args");
    let roscore_args = dir.join("roscore.args");
    let roslaunch_args = dir.join("roslaunch.args");
    let mut config = test_config().with_roscore_port(11411);
    config.roscore_command = recorder("roscore", &roscore_args);
    config.roslaunch_command = recorder("roslaunch", &roslaunch_args);
    let launch_file = config.launch_file_path.display().to_string();

    let (mut env, client) = launch(config).await;

    assert_eq!(wait_for_file(&roscore_args).await.trim(), "-p 11411");
    assert_eq!(
        wait_for_file(&roslaunch_args).await.trim(),
        format!("-p 11411 {} gui:=false", launch_file)
    );
    assert_eq!(client.waits.load(Ordering::SeqCst), 1);

    assert_ok!(env.close().await);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn startup_spawns_broker_then_simulator_then_waits() {
    let dir = scratch_dir("startup_order");
    let roscore_args = dir.join("roscore.args");
    let roslaunch_args = dir.join("roslaunch.args");
    let mut config = test_config();
    config.roscore_startup_delay_ms = 200;
    config.roscore_command = recorder("roscore", &roscore_args);
    config.roslaunch_command = recorder("roslaunch", &roslaunch_args);

    // 等待服务时两个进程都必须已经启动
    let client = Arc::new(MockServiceClient::waiting_for(vec![
        roscore_args.clone(),
        roslaunch_args.clone(),
    ]));
    let mut env = assert_ok!(RopodEnv::launch_with_client(config, client.clone()).await);
    assert_eq!(client.waits.load(Ordering::SeqCst), 1);

    let roscore_started = read_stamp(&roscore_args);
    let roslaunch_started = read_stamp(&roslaunch_args);
    assert!(
        roscore_started < roslaunch_started,
        "roscore ({}) 应先于 roslaunch ({}) 启动",
        roscore_started,
        roslaunch_started
    );

    assert_ok!(env.close().await);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn failed_simulator_spawn_terminates_broker() {
    let dir = scratch_dir("sim_spawn_failed");
    let ready = dir.join("roscore.ready");
    let terminated = dir.join("roscore.terminated");
    let mut config = test_config();
    config.roscore_startup_delay_ms = 300;
    config.roscore_command = term_recorder("roscore", &ready, &terminated);
    config.roslaunch_command = CommandSpec::new(dir.join("no-such-roslaunch").display().to_string());
    let client = Arc::new(MockServiceClient::default());

    let err = RopodEnv::launch_with_client(config, client.clone())
        .await
        .err()
        .expect("仿真器启动应失败");

    assert!(matches!(err, EnvError::Process(_)));
    assert!(ready.exists());
    // 收到的是 SIGTERM 而不是 drop 时的 SIGKILL
    assert_eq!(std::fs::read_to_string(&terminated).unwrap().trim(), "term");
    assert_eq!(client.waits.load(Ordering::SeqCst), 0);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn failed_service_wait_terminates_started_processes() {
    let dir = scratch_dir("wait_failed");
    let roscore_ready = dir.join("roscore.ready");
    let roscore_terminated = dir.join("roscore.terminated");
    let sim_ready = dir.join("roslaunch.ready");
    let sim_terminated = dir.join("roslaunch.terminated");
    let mut config = test_config();
    config.roscore_command = term_recorder("roscore", &roscore_ready, &roscore_terminated);
    config.roslaunch_command = term_recorder("roslaunch", &sim_ready, &sim_terminated);
    let client = Arc::new(MockServiceClient {
        fail_wait: true,
        ..MockServiceClient::waiting_for(vec![roscore_ready, sim_ready])
    });

    let err = RopodEnv::launch_with_client(config, client.clone())
        .await
        .err()
        .expect("等待服务应失败");

    assert!(matches!(err, EnvError::Other(_)));
    assert_eq!(std::fs::read_to_string(&roscore_terminated).unwrap().trim(), "term");
    assert_eq!(std::fs::read_to_string(&sim_terminated).unwrap().trim(), "term");
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn render_twice_starts_one_visualizer() {
    let (mut env, _client) = launch(test_config()).await;
    assert_eq!(env.visualizer_pid(), None);

    assert_ok!(env.render(RenderMode::Human).await);
    let first = env.visualizer_pid();
    assert!(first.is_some());

    assert_ok!(env.render(RenderMode::Human).await);
    assert_eq!(env.visualizer_pid(), first);
    assert!(env.is_visualizer_running());

    assert_ok!(env.close().await);
    assert!(!env.is_visualizer_running());
}

#[tokio::test]
async fn render_restarts_exited_visualizer() {
    let (mut env, _client) = launch(test_config()).await;
    assert_ok!(env.render(RenderMode::Human).await);
    let first = env.visualizer_pid().unwrap();

    let status = std::process::Command::new("kill")
        .arg(first.to_string())
        .status()
        .unwrap();
    assert!(status.success());
    for _ in 0..100 {
        if !env.is_visualizer_running() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!env.is_visualizer_running());

    assert_ok!(env.render(RenderMode::Human).await);
    assert!(env.is_visualizer_running());
    assert_ne!(env.visualizer_pid(), Some(first));

    assert_ok!(env.close().await);
}

#[tokio::test]
async fn close_without_render_stops_broker_and_simulator() {
    let (mut env, _client) = launch(test_config()).await;
    assert!(env.is_roscore_running());
    assert!(env.is_simulator_running());

    assert_ok!(env.close().await);

    assert!(!env.is_roscore_running());
    assert!(!env.is_simulator_running());
    assert_eq!(env.visualizer_pid(), None);
    assert!(env.is_closed());

    // 重复关闭无副作用
    assert_ok!(env.close().await);
}

#[tokio::test]
async fn render_after_close_is_rejected() {
    let (mut env, _client) = launch(test_config()).await;
    assert_ok!(env.close().await);

    let err = assert_err!(env.render(RenderMode::Human).await);
    assert!(err.is_closed());
    assert_eq!(env.visualizer_pid(), None);
}

#[tokio::test]
async fn base_env_step_and_reset_are_not_implemented() {
    let (mut env, client) = launch(test_config()).await;

    let step_err = assert_err!(GymEnv::step(&mut env, 0).await);
    assert!(step_err.is_not_implemented());
    let reset_err = assert_err!(GymEnv::reset(&mut env).await);
    assert!(reset_err.is_not_implemented());
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);

    assert_ok!(GymEnv::close(&mut env).await);
}

#[tokio::test]
async fn nav_env_publishes_velocity_and_resets_simulation() {
    let (base, client) = launch(test_config()).await;
    let publisher = RecordingPublisher::default();
    let mut env = RopodNavDiscreteEnv::from_parts(base, Box::new(publisher.clone()));
    assert_eq!(env.action_space().n, 5);

    let outcome = assert_ok!(env.step(2).await);
    assert!(!outcome.done);
    assert_eq!(outcome.info["action"], "right");
    assert_eq!(
        publisher.published.lock().unwrap().as_slice(),
        &[VelocityCommand::new(0.0, -0.1, 0.0)]
    );

    let err = assert_err!(env.step(7).await);
    assert!(matches!(err, EnvError::InvalidAction { action: 7, .. }));
    assert_eq!(publisher.published.lock().unwrap().len(), 1);

    assert_ok!(env.reset().await);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);

    assert_ok!(env.close().await);
    assert_ok!(env.close().await);
    assert_eq!(publisher.shutdowns.load(Ordering::SeqCst), 1);
    assert!(!env.base_mut().is_roscore_running());
}
