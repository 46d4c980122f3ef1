use nmos_testing_facade::browser::{ChromiumLauncher, LaunchOptions, SessionLauncher};
use nmos_testing_facade::config::Config;
use nmos_testing_facade::logger;
use nmos_testing_facade::services::{ControllerDriver, DriverSettings, ResourcePage};

#[tokio::test]
#[ignore] // 默认忽略，需要本地 nmos-js 与浏览器：cargo test -- --ignored
async fn test_browser_launch() {
    // 初始化日志
    logger::init(false);

    // 加载配置
    let config = Config::from_env().expect("配置无效");

    // 测试浏览器启动（或连接 BROWSER_DEBUG_PORT）
    let launcher = ChromiumLauncher::new(LaunchOptions::from_config(&config));
    let session = launcher.launch().await.expect("启动浏览器失败");

    session.close().await.expect("关闭浏览器失败");
}

#[tokio::test]
#[ignore]
async fn test_set_up_and_list_senders() {
    // 初始化日志
    logger::init(false);

    // 加载配置
    let config = Config::from_env().expect("配置无效");

    let launcher = ChromiumLauncher::new(LaunchOptions::from_config(&config));
    let session = launcher.launch().await.expect("启动浏览器失败");
    let driver = ControllerDriver::new(session, DriverSettings::from_config(&config));

    // 把控制器指向 mock registry 后浏览 Senders
    driver.set_up().await.expect("设置控制器失败");
    driver
        .navigate_to_page(ResourcePage::Senders)
        .await
        .expect("打开 Senders 页面失败");
    let senders = driver.find_resource_labels().await.expect("读取发送端失败");
    println!("找到 {} 个发送端: {:?}", senders.len(), senders);

    driver.tear_down().await.expect("关闭浏览器失败");
}
