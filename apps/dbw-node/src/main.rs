//! # DBW Node
//!
//! 线控适配器节点：
//! - 标准输入：每行一条 JSON 指令（油门 / 制动 / 转向）
//! - CAN 总线：每个 tick 发送 3 个控制帧，接收执行器反馈
//! - 标准输出：每行一份 JSON 反馈报告
//!
//! ```bash
//! dbw-node --interface can0 --config dbw.toml
//! echo '{"type":"brake","enabled":true,"pedal_percent":30}' | dbw-node -i vcan0
//! ```

mod input;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossbeam_channel::{Receiver, bounded, never, select};
use dbw_driver::{DEFAULT_INTERFACE, DbwCommand, DbwConfig, DbwDriver, DbwDriverBuilder, FeedbackReport};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// 报告通道容量（RX 线程 try_send，满时丢弃）
const REPORT_QUEUE: usize = 256;

/// 检查驱动状态的间隔
const HEALTH_CHECK: Duration = Duration::from_millis(200);

/// DBW Node - 线控底盘 CAN 适配器
#[derive(Parser, Debug)]
#[command(name = "dbw-node")]
#[command(about = "Drive-by-wire CAN adapter: JSON commands in, feedback reports out", long_about = None)]
#[command(version)]
struct Args {
    /// SocketCAN 接口名称
    #[arg(short, long, default_value = DEFAULT_INTERFACE)]
    interface: String,

    /// TOML 配置文件（缺省使用内置默认值）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 打印生效的配置后退出
    #[arg(long)]
    print_config: bool,

    /// 不设置内核 CAN ID 过滤器
    #[arg(long)]
    no_hw_filter: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("dbw_node=info".parse()?);
    if verbose {
        filter = filter
            .add_directive("dbw_node=debug".parse()?)
            .add_directive("dbw_driver=debug".parse()?);
    }

    // 日志写 stderr，stdout 只输出报告
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DbwConfig> {
    match path {
        Some(path) => DbwConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(DbwConfig::default()),
    }
}

fn write_report(out: &mut impl Write, report: &FeedbackReport) -> Result<()> {
    serde_json::to_writer(&mut *out, report)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// 主循环：转发指令、输出报告，直到收到 Ctrl-C 或驱动停止
fn run(
    driver: &DbwDriver,
    commands: Receiver<DbwCommand>,
    reports: Receiver<FeedbackReport>,
    shutdown: Receiver<()>,
) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut input_open = true;

    loop {
        let input = if input_open { commands.clone() } else { never() };
        select! {
            recv(shutdown) -> _ => {
                info!("Shutdown requested");
                return Ok(());
            },
            recv(input) -> msg => match msg {
                Ok(cmd) => {
                    driver.send_command(cmd)?;
                },
                Err(_) => {
                    // 输入结束后继续运行：看门狗会在超时后禁用所有通道
                    warn!("Command input closed, channels will time out");
                    input_open = false;
                },
            },
            recv(reports) -> msg => match msg {
                Ok(report) => write_report(&mut out, &report)?,
                Err(_) => bail!("report channel closed"),
            },
            default(HEALTH_CHECK) => {
                if !driver.is_running() {
                    bail!("CAN driver stopped after a fatal bus error");
                }
            },
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = load_config(args.config.as_deref())?;
    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let (report_tx, report_rx) = bounded::<FeedbackReport>(REPORT_QUEUE);
    let driver = DbwDriverBuilder::new()
        .interface(&args.interface)
        .config(config)
        .hardware_filter(!args.no_hw_filter)
        .build(report_tx)
        .with_context(|| format!("failed to start DBW driver on '{}'", args.interface))?;

    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .context("failed to set Ctrl-C handler")?;

    let (command_tx, command_rx) = bounded::<DbwCommand>(64);
    // stdin 读取线程阻塞在 read 上，不回收；进程退出时随之结束
    input::spawn_stdin_reader(command_tx).context("failed to spawn stdin reader")?;

    info!("DBW node running on '{}'", args.interface);
    let result = run(&driver, command_rx, report_rx, shutdown_rx);

    let metrics = driver.metrics();
    info!(
        "Stopping: ticks={}, tx_frames={}, tx_errors={} ({:.2}%), reports={}, watchdog_trips={}",
        metrics.ticks,
        metrics.tx_frames_total,
        metrics.tx_errors,
        metrics.tx_error_rate() * 100.0,
        metrics.reports_published,
        metrics.watchdog_trips
    );
    drop(driver);
    result
}
