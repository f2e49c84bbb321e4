//! 控制台会话命令行入口
//! 使用文件存储驱动同一个会话守卫：登录、检查、查看角色、退出

use clap::{Parser, Subcommand};
use console_session::{
    config::AppConfig,
    error::AppError,
    models::auth::{LoginRequest, ResetPasswordRequest},
    session::{FileStorage, SessionGuard, SessionStatus},
    telemetry, Navigator,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "console-session", version, about = "Inventory console session tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 登录并保存令牌对
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "CONSOLE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// 检查会话，必要时刷新访问令牌
    Check,
    /// 显示当前令牌携带的角色
    Roles,
    /// 显示当前令牌的声明
    Whoami,
    /// 从身份服务获取当前账号信息
    Profile,
    /// 申请重置密码邮件
    ForgotPassword {
        #[arg(short, long)]
        username: String,
    },
    /// 使用邮件中的令牌设置新密码
    ResetPassword {
        #[arg(short, long)]
        token: String,
        #[arg(long, env = "CONSOLE_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
    /// 清除令牌
    Logout,
}

fn fail(e: AppError) -> ! {
    tracing::debug!(error = %e, "Command failed");
    eprintln!("{}", e.user_message());
    std::process::exit(1);
}

/// 终端里的“跳转”：提示用户接下来该做什么
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect(&self, path: &str) {
        println!("-> {}", path);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 按优先级加载：.env.local > .env
    dotenv::from_filename(".env.local").ok();
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    telemetry::init_telemetry(&config.logging);

    let storage = Arc::new(FileStorage::new(&config.session.storage_path));
    let guard = Arc::new(SessionGuard::from_config(
        &config,
        storage,
        Arc::new(TerminalNavigator),
    )?);

    match cli.command {
        Command::Login { username, password } => {
            match guard.login(LoginRequest { username, password }).await {
                Ok(user) => {
                    let name = user
                        .map(|u| if u.fullname.is_empty() { u.username } else { u.fullname })
                        .unwrap_or_default();
                    println!("Logged in {}", name);
                }
                Err(e) => fail(e),
            }
        }
        Command::Check => {
            let gate = guard.mount();
            println!("{}", gate.status().as_str());
            let status = gate.resolve().await;
            println!("{}", status.as_str());
            if status != SessionStatus::Authenticated {
                std::process::exit(1);
            }
        }
        Command::Roles => {
            for role in &guard.reader().roles() {
                println!("{}", role);
            }
        }
        Command::Whoami => match guard.reader().claims() {
            Some(claims) => {
                println!("subject: {}", claims.subject.as_deref().unwrap_or("-"));
                println!("expires_at: {}", claims.expires_at.to_rfc3339());
                println!("expired: {}", claims.is_expired());
                println!("scopes: {}", claims.scopes.join(" "));
            }
            None => {
                eprintln!("No session");
                std::process::exit(1);
            }
        },
        Command::Profile => match guard.my_info().await {
            Ok(user) => {
                println!("username: {}", user.username);
                println!("fullname: {}", user.fullname);
                println!("email: {}", user.email);
                println!("phone: {}", user.phone);
                println!("active: {}", user.active);
                let roles: Vec<&str> = user.roles.iter().map(|r| r.name.as_str()).collect();
                println!("roles: {}", roles.join(" "));
            }
            Err(e) => fail(e),
        },
        Command::ForgotPassword { username } => match guard.forgot_password(&username).await {
            Ok(notice) => println!(
                "{}",
                notice.unwrap_or_else(|| "Password reset link sent, check your email".to_string())
            ),
            Err(e) => fail(e),
        },
        Command::ResetPassword { token, new_password } => {
            let request = ResetPasswordRequest { token, new_password };
            match guard.reset_password(request).await {
                Ok(notice) => println!("{}", notice.unwrap_or_else(|| "Password updated".to_string())),
                Err(e) => fail(e),
            }
        }
        Command::Logout => guard.logout().await,
    }

    Ok(())
}
