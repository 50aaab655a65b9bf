// ==========================================
// 校园服务工单系统 - 命令行入口
// ==========================================
// 输出: 成功时 stdout 打印 JSON; 失败时 stderr 打印 ErrorResponse JSON, 退出码 1
// 会话令牌: --token 或 CLEANIFY_TOKEN
// ==========================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use cleanify::api::{CreateRequestForm, ProfileUpdate};
use cleanify::app::{commands, AppState};
use cleanify::auth::SignupForm;
use cleanify::config::AppConfig;
use cleanify::domain::{ActionType, Category, RequestStatus, Role};
use cleanify::repository::{RequestFilter, UserFilter};

#[derive(Parser)]
#[command(name = "cleanify", version, about = "校园设施服务工单系统")]
struct Cli {
    /// 数据库文件路径
    #[arg(long, global = true, env = "CLEANIFY_DB_PATH")]
    db: Option<String>,

    /// 图片根目录
    #[arg(long, global = true, env = "CLEANIFY_MEDIA_ROOT")]
    media_root: Option<PathBuf>,

    /// 会话令牌（login 输出）
    #[arg(long, global = true, env = "CLEANIFY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// 消息语言 (en / zh-CN)
    #[arg(long, global = true, env = "CLEANIFY_LOCALE")]
    locale: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 创建数据库并建表
    InitDb,
    /// 创建管理员账号
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "CLEANIFY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// 注册（报修人或维修工）
    Signup(SignupArgs),
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "CLEANIFY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Whoami,
    /// 当前角色的工作台
    Dashboard,
    /// 报修人操作
    Request {
        #[command(subcommand)]
        command: RequestCommand,
    },
    /// 维修工操作
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// 管理员操作
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// 全局配置
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Args)]
struct SignupArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "")]
    first_name: String,
    #[arg(long, default_value = "")]
    last_name: String,
    #[arg(long, env = "CLEANIFY_PASSWORD", hide_env_values = true)]
    password: String,
    /// 确认密码（默认与 --password 相同）
    #[arg(long)]
    password_confirm: Option<String>,
    #[arg(long, value_parser = parse_role)]
    role: Role,
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
}

#[derive(Subcommand)]
enum RequestCommand {
    /// 提交报修
    Create {
        #[arg(long, value_parser = parse_category)]
        category: Category,
        #[arg(long)]
        location: String,
        #[arg(long)]
        description: Option<String>,
        /// 现场照片文件
        #[arg(long)]
        image: String,
    },
    /// 确认或驳回完工并评分
    Review {
        request_id: i64,
        #[arg(long, value_enum)]
        decision: Decision,
        /// 1-5
        #[arg(long)]
        rating: Option<u8>,
    },
    /// 我的工单
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum Decision {
    Approve,
    Reject,
}

#[derive(Subcommand)]
enum TaskCommand {
    /// 上传完工照片
    Complete {
        request_id: i64,
        #[arg(long)]
        image: String,
    },
}

#[derive(Args)]
struct RequestFilterArgs {
    #[arg(long, value_parser = parse_status)]
    status: Option<RequestStatus>,
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
    #[arg(long)]
    approved: Option<bool>,
    /// 模糊检索
    #[arg(long)]
    query: Option<String>,
}

impl RequestFilterArgs {
    fn to_filter(&self) -> RequestFilter {
        RequestFilter {
            status: self.status,
            category: self.category,
            approved: self.approved,
            query: self.query.clone(),
        }
    }
}

#[derive(Subcommand)]
enum AdminCommand {
    /// 人工派单
    Assign { request_id: i64, worker_id: i64 },
    /// 可派单维修工
    Workers,
    /// 用户列表
    Users {
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
        #[arg(long)]
        active_only: bool,
    },
    /// 编辑用户档案
    Profile {
        user_id: i64,
        #[arg(long, value_parser = parse_role)]
        role: Role,
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
        #[arg(long)]
        busy: bool,
    },
    /// 启用/停用账号
    Activate {
        user_id: i64,
        #[arg(long)]
        deactivate: bool,
    },
    /// 授予/撤销管理员
    Staff {
        user_id: i64,
        #[arg(long)]
        revoke: bool,
    },
    /// 工单检索
    Search {
        #[command(flatten)]
        filter: RequestFilterArgs,
        #[arg(long, default_value_t = 1)]
        page: i64,
    },
    /// 导出 CSV
    Export {
        #[command(flatten)]
        filter: RequestFilterArgs,
        #[arg(long)]
        output: String,
    },
    /// 操作日志
    Logs {
        /// 只看某张工单的历史
        #[arg(long)]
        request: Option<i64>,
        #[arg(long = "type", value_parser = parse_action_type)]
        action_type: Option<ActionType>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    List,
    Set { key: String, value: String },
}

// ==========================================
// 参数解析
// ==========================================

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("未知的角色: {}", s))
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::parse(s).ok_or_else(|| format!("未知的类别: {}", s))
}

fn parse_status(s: &str) -> Result<RequestStatus, String> {
    RequestStatus::parse(s).ok_or_else(|| format!("未知的工单状态: {}", s))
}

fn parse_action_type(s: &str) -> Result<ActionType, String> {
    ActionType::parse(s).ok_or_else(|| format!("未知的操作类型: {}", s))
}

fn require_token(token: &Option<String>) -> Result<&str, String> {
    token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| "缺少会话令牌: 请使用 --token 或设置 CLEANIFY_TOKEN".to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(media_root) = &cli.media_root {
        config.media_root = media_root.clone();
    }
    if let Some(locale) = cli.locale.as_ref().or(config.locale.as_ref()) {
        cleanify::i18n::set_locale(locale);
    }

    cleanify::logging::init(config.log_format);
    tracing::debug!(version = cleanify::VERSION, "{} 启动", cleanify::APP_NAME);

    let result = AppState::from_config(&config).and_then(|state| run(&state, &cli));
    match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(state: &AppState, cli: &Cli) -> Result<String, String> {
    match &cli.command {
        Commands::InitDb => commands::init_db(state),
        Commands::CreateAdmin {
            username,
            email,
            password,
        } => commands::create_admin(state, username, email, password),
        Commands::Signup(args) => {
            let form = SignupForm {
                username: args.username.clone(),
                email: args.email.clone(),
                first_name: args.first_name.clone(),
                last_name: args.last_name.clone(),
                password1: args.password.clone(),
                password2: args
                    .password_confirm
                    .clone()
                    .unwrap_or_else(|| args.password.clone()),
                role: Some(args.role),
                category: args.category,
            };
            commands::signup(state, &form)
        }
        Commands::Login { username, password } => commands::login(state, username, password),
        Commands::Logout => commands::logout(state, require_token(&cli.token)?),
        Commands::Whoami => commands::whoami(state, require_token(&cli.token)?),
        Commands::Dashboard => commands::dashboard(state, require_token(&cli.token)?),
        Commands::Request { command } => {
            let token = require_token(&cli.token)?;
            match command {
                RequestCommand::Create {
                    category,
                    location,
                    description,
                    image,
                } => {
                    let form = CreateRequestForm {
                        category: Some(*category),
                        location: location.clone(),
                        description: description.clone(),
                    };
                    commands::create_request(state, token, &form, image)
                }
                RequestCommand::Review {
                    request_id,
                    decision,
                    rating,
                } => commands::review_request(
                    state,
                    token,
                    *request_id,
                    matches!(decision, Decision::Approve),
                    *rating,
                ),
                RequestCommand::List => commands::list_my_requests(state, token),
            }
        }
        Commands::Task { command } => {
            let token = require_token(&cli.token)?;
            match command {
                TaskCommand::Complete { request_id, image } => {
                    commands::complete_task(state, token, *request_id, image)
                }
            }
        }
        Commands::Admin { command } => {
            let token = require_token(&cli.token)?;
            run_admin(state, token, command)
        }
        Commands::Config { command } => {
            let token = require_token(&cli.token)?;
            match command {
                ConfigCommand::List => commands::list_configs(state, token),
                ConfigCommand::Set { key, value } => commands::update_config(state, token, key, value),
            }
        }
    }
}

fn run_admin(state: &AppState, token: &str, command: &AdminCommand) -> Result<String, String> {
    match command {
        AdminCommand::Assign {
            request_id,
            worker_id,
        } => commands::manual_assign(state, token, *request_id, *worker_id),
        AdminCommand::Workers => commands::list_assignable_workers(state, token),
        AdminCommand::Users {
            role,
            category,
            active_only,
        } => {
            let filter = UserFilter {
                role: *role,
                category: *category,
                active_only: *active_only,
            };
            commands::list_users(state, token, &filter)
        }
        AdminCommand::Profile {
            user_id,
            role,
            category,
            busy,
        } => {
            let update = ProfileUpdate {
                role: *role,
                category: *category,
                is_busy: *busy,
            };
            commands::update_profile(state, token, *user_id, &update)
        }
        AdminCommand::Activate {
            user_id,
            deactivate,
        } => commands::set_user_active(state, token, *user_id, !*deactivate),
        AdminCommand::Staff { user_id, revoke } => {
            commands::set_user_staff(state, token, *user_id, !*revoke)
        }
        AdminCommand::Search { filter, page } => {
            commands::search_requests(state, token, &filter.to_filter(), *page)
        }
        AdminCommand::Export { filter, output } => {
            commands::export_requests_csv(state, token, &filter.to_filter(), output)
        }
        AdminCommand::Logs {
            request,
            action_type,
            limit,
        } => match request {
            Some(request_id) => commands::request_history(state, token, *request_id),
            None => commands::action_logs(state, token, *action_type, *limit),
        },
    }
}
